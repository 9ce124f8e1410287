//! Generator trait — the abstraction over text-generation backends.
//!
//! A Generator knows how to turn a prompt (plus optional turn history) into
//! text, either as a complete output or as a stream of chunks. It is used in
//! two places: rewriting follow-up utterances into self-contained queries,
//! and producing the final answer.
//!
//! Different backends answer in different wire shapes — some return a bare
//! string, some a structured message object. `GenerationOutput` models both
//! so that call sites never branch on the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::turn::ConversationTurn;

/// A request to a text-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "gpt-4o-mini").
    pub model: String,

    /// System instruction, when the backend supports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Prior conversation turns to condition on, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ConversationTurn>,

    /// The prompt for this request.
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    /// A minimal request with just a model and a prompt.
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            history: Vec::new(),
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// A structured message wrapper, as returned by chat-style backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredMessage {
    /// The author role reported by the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// The text content.
    pub content: String,
}

/// What a generation backend hands back: either bare text or a structured
/// message. One normalization function produces plain text from either
/// variant — call sites never inspect which shape the backend produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenerationOutput {
    Structured(StructuredMessage),
    PlainText(String),
}

impl GenerationOutput {
    /// Normalize either variant to plain text.
    pub fn into_text(self) -> String {
        match self {
            Self::PlainText(text) => text,
            Self::Structured(msg) => msg.content,
        }
    }

    /// Borrowed view of the text content.
    pub fn as_text(&self) -> &str {
        match self {
            Self::PlainText(text) => text,
            Self::Structured(msg) => &msg.content,
        }
    }
}

/// A single chunk in a streaming generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationChunk {
    /// Partial content delta.
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk.
    #[serde(default)]
    pub done: bool,
}

/// The core Generator trait.
///
/// Every text-generation backend implements this trait. The engine calls
/// `complete()` or `stream()` without knowing which backend is in use.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get the complete output.
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationOutput, GeneratorError>;

    /// Send a request and get a stream of output chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a
    /// single chunk.
    async fn stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<GenerationChunk, GeneratorError>>,
        GeneratorError,
    > {
        let output = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(GenerationChunk {
                content: Some(output.into_text()),
                done: true,
            }))
            .await;
        Ok(rx)
    }
}
