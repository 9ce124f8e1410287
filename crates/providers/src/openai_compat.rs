//! OpenAI-compatible generator implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! OpenAI-compatible `/v1/chat/completions` endpoint.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Health checks

use async_trait::async_trait;
use futures::StreamExt;
use fuente_core::error::GeneratorError;
use fuente_core::generate::{
    GenerationChunk, GenerationOutput, GenerationRequest, Generator, StructuredMessage,
};
use fuente_core::turn::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A generator backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    /// Create a new OpenAI-compatible generator.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build a generator from configuration.
    pub fn from_config(config: &fuente_config::GenerationConfig) -> Result<Self, GeneratorError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GeneratorError::NotConfigured("No generation API key set".into()))?;
        Self::new(
            "openai",
            &config.api_url,
            api_key,
            std::time::Duration::from_secs(config.timeout_secs),
        )
    }

    /// Convert a generation request to the chat-completions message list.
    fn to_api_messages(request: &GenerationRequest) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(request.history.len() + 2);

        if let Some(system) = &request.system {
            messages.push(ApiMessage {
                role: "system".into(),
                content: system.clone(),
            });
        }

        for turn in &request.history {
            messages.push(ApiMessage {
                role: match turn.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                },
                content: turn.text.clone(),
            });
        }

        messages.push(ApiMessage {
            role: "user".into(),
            content: request.prompt.clone(),
        });

        messages
    }

    fn map_error_status(status: u16, body: String) -> GeneratorError {
        match status {
            429 => GeneratorError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => GeneratorError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => GeneratorError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl Generator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationOutput, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(generator = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(e.to_string())
                } else {
                    GeneratorError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generator returned error");
            return Err(Self::map_error_status(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| GeneratorError::MalformedOutput(
                format!("Failed to parse completion response: {e}"),
            ))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::MalformedOutput("No choices in response".into()))?;

        // Chat backends answer with a structured message wrapper; the engine
        // normalizes it through GenerationOutput::into_text().
        Ok(GenerationOutput::Structured(StructuredMessage {
            role: Some(choice.message.role),
            content: choice.message.content,
        }))
    }

    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<GenerationChunk, GeneratorError>>,
        GeneratorError,
    > {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request),
            "temperature": request.temperature,
            "stream": true,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(generator = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(e.to_string())
                } else {
                    GeneratorError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generator streaming error");
            return Err(Self::map_error_status(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let generator_name = self.name.clone();

        // Read the SSE byte stream and parse "data:" chunks into deltas.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(GeneratorError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        let data = data.trim();

                        if data == "[DONE]" {
                            let _ = tx
                                .send(Ok(GenerationChunk {
                                    content: None,
                                    done: true,
                                }))
                                .await;
                            return;
                        }

                        match serde_json::from_str::<StreamResponse>(data) {
                            Ok(stream_resp) => {
                                if let Some(choice) = stream_resp.choices.first() {
                                    let has_content = choice
                                        .delta
                                        .content
                                        .as_ref()
                                        .is_some_and(|c| !c.is_empty());
                                    if has_content {
                                        let chunk = GenerationChunk {
                                            content: choice.delta.content.clone(),
                                            done: false,
                                        };
                                        if tx.send(Ok(chunk)).await.is_err() {
                                            return; // receiver dropped
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                trace!(
                                    generator = %generator_name,
                                    data = %data,
                                    error = %e,
                                    "Ignoring unparseable SSE chunk"
                                );
                            }
                        }
                    }
                }
            }

            // Stream ended without [DONE] — send final chunk
            let _ = tx
                .send(Ok(GenerationChunk {
                    content: None,
                    done: true,
                }))
                .await;
        });

        Ok(rx)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    role: String,
    #[serde(default)]
    content: String,
}

// --- Streaming SSE types ---

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
