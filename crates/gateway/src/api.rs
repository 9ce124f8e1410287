//! HTTP API v1 — chat and session endpoints.
//!
//! Endpoints:
//!
//! - `POST /v1/chat`           — Send a message, get a cited answer
//! - `POST /v1/chat/stream`    — Send a message, get an SSE event stream
//! - `GET  /v1/sessions`       — List sessions
//! - `GET  /v1/sessions/{id}`  — Get a session transcript
//! - `DELETE /v1/sessions/{id}`— Reset a session
//! - `GET  /health`            — Liveness (mounted at the root)

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, Sse},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use fuente_core::store::SessionStore;
use fuente_core::turn::SessionId;
use fuente_engine::ChatEngine;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiState {
    pub engine: Arc<ChatEngine>,
    pub store: Arc<dyn SessionStore>,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiState {
    pub fn new(engine: Arc<ChatEngine>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            engine,
            store,
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedApiState = Arc<ApiState>;

// ── Routers ───────────────────────────────────────────────────────────────

/// Health endpoints, mounted at the root.
pub fn health_router() -> Router {
    Router::new().route("/health", get(health_handler))
}

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}", get(get_session_handler))
        .route("/sessions/{id}", delete(reset_session_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatRequest {
    /// Existing session ID (omit to create a new session).
    #[serde(default)]
    session_id: Option<String>,
    /// The user's message.
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    answer: String,
    sources: Vec<SourceDto>,
    is_follow_up: bool,
    conversational_meta: bool,
    degraded: bool,
}

#[derive(Serialize, Deserialize)]
struct SourceDto {
    title: String,
    url: String,
    snippet: String,
    relevance_score: f32,
}

#[derive(Serialize, Deserialize)]
struct SessionListResponse {
    sessions: Vec<SessionSummaryDto>,
}

#[derive(Serialize, Deserialize)]
struct SessionSummaryDto {
    id: String,
    turns: usize,
}

#[derive(Serialize)]
struct SessionDetailResponse {
    id: String,
    turns: Vec<TurnDto>,
}

#[derive(Serialize, Deserialize)]
struct TurnDto {
    role: String,
    text: String,
    timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    cited_urls: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ResetResponse {
    id: String,
    reset: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn validate_message(message: &str) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if message.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "Message must not be empty".into(),
            }),
        ));
    }
    Ok(())
}

fn session_from(request_id: Option<String>) -> SessionId {
    request_id
        .filter(|id| !id.trim().is_empty())
        .map(|id| SessionId::from(&id))
        .unwrap_or_default()
}

async fn chat_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    validate_message(&payload.message)?;

    let session = session_from(payload.session_id);
    info!(session = %session, "v1/chat request");

    let outcome = state.engine.respond(&session, payload.message.trim()).await;

    let sources = outcome
        .citations
        .sources
        .iter()
        .map(|s| SourceDto {
            title: s.source.title.clone(),
            url: s.source.url.clone(),
            snippet: s.source.snippet.clone(),
            relevance_score: s.relevance_score,
        })
        .collect();

    Ok(Json(ChatResponse {
        session_id: outcome.session_id.to_string(),
        answer: outcome.answer,
        sources,
        is_follow_up: outcome.query.is_follow_up,
        conversational_meta: outcome.query.is_conversational_meta,
        degraded: outcome.degraded,
    }))
}

/// `POST /v1/chat/stream` — Send a message, receive an SSE stream of chat
/// events (`chunk`, `sources`, `done`, `error`).
async fn chat_stream_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<ChatRequest>,
) -> Result<
    Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    validate_message(&payload.message)?;

    let session = session_from(payload.session_id);
    info!(session = %session, "v1/chat/stream SSE request");

    let rx = state
        .engine
        .clone()
        .respond_stream(session, payload.message.trim().to_string());

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type().to_string();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream))
}

async fn list_sessions_handler(
    State(state): State<SharedApiState>,
) -> Result<Json<SessionListResponse>, StatusCode> {
    let ids = state
        .store
        .sessions()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut sessions = Vec::with_capacity(ids.len());
    for id in ids {
        let turns = state
            .store
            .history(&id)
            .await
            .map(|t| t.len())
            .unwrap_or(0);
        sessions.push(SessionSummaryDto {
            id: id.to_string(),
            turns,
        });
    }
    sessions.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(Json(SessionListResponse { sessions }))
}

async fn get_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<SessionDetailResponse>, StatusCode> {
    let session = SessionId::from(&id);

    let known = state
        .store
        .sessions()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !known.contains(&session) {
        return Err(StatusCode::NOT_FOUND);
    }

    let transcript = state
        .store
        .history(&session)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(SessionDetailResponse {
        id,
        turns: transcript
            .turns
            .iter()
            .map(|t| TurnDto {
                role: format!("{:?}", t.role).to_lowercase(),
                text: t.text.clone(),
                timestamp: t.timestamp.to_rfc3339(),
                cited_urls: t.cited_urls.clone(),
            })
            .collect(),
    }))
}

async fn reset_session_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, StatusCode> {
    let session = SessionId::from(&id);
    let reset = state
        .store
        .reset(&session)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !reset {
        return Err(StatusCode::NOT_FOUND);
    }

    info!(session = %id, "Session reset");
    Ok(Json(ResetResponse { id, reset }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use fuente_core::error::GeneratorError;
    use fuente_core::generate::{GenerationOutput, GenerationRequest, Generator};
    use fuente_core::turn::ConversationTurn;
    use fuente_session::InMemoryStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct FixedGenerator(String);

    #[async_trait]
    impl Generator for FixedGenerator {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationOutput, GeneratorError> {
            Ok(GenerationOutput::PlainText(self.0.clone()))
        }
    }

    fn test_state() -> SharedApiState {
        let store = Arc::new(InMemoryStore::new());
        let engine = Arc::new(ChatEngine::new(
            Arc::new(FixedGenerator("Respuesta de prueba.".into())),
            None,
            None,
            store.clone(),
            &fuente_config::AppConfig::default(),
        ));
        Arc::new(ApiState::new(engine, store))
    }

    fn router(state: SharedApiState) -> Router {
        crate::build_router(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn chat_returns_answer() {
        let response = router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"message":"receta de torta de manzana casera"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["answer"], "Respuesta de prueba.");
        assert!(!json["session_id"].as_str().unwrap().is_empty());
        // No search provider configured in the test state
        assert_eq!(json["degraded"], true);
        assert_eq!(json["sources"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_message_is_unprocessable() {
        let response = router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"message":"   "}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn session_detail_and_reset() {
        let state = test_state();
        let session = SessionId::from("existing");
        state
            .store
            .append(&session, ConversationTurn::user("hola"))
            .await
            .unwrap();

        // Detail
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/v1/sessions/existing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["turns"].as_array().unwrap().len(), 1);
        assert_eq!(json["turns"][0]["role"], "user");

        // Reset
        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/sessions/existing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Second reset finds nothing
        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/v1/sessions/existing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_session_detail_is_not_found() {
        let response = router(test_state())
            .oneshot(
                Request::builder()
                    .uri("/v1/sessions/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn sessions_list_counts_turns() {
        let state = test_state();
        let session = SessionId::from("s1");
        state
            .store
            .append(&session, ConversationTurn::user("uno"))
            .await
            .unwrap();
        state
            .store
            .append(&session, ConversationTurn::assistant("dos"))
            .await
            .unwrap();

        let response = router(state)
            .oneshot(
                Request::builder()
                    .uri("/v1/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["sessions"][0]["id"], "s1");
        assert_eq!(json["sessions"][0]["turns"], 2);
    }

    #[tokio::test]
    async fn chat_stream_returns_event_stream() {
        let response = router(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/chat/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"message":"receta de torta de manzana casera"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(content_type.starts_with("text/event-stream"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("event: chunk"));
        assert!(body.contains("event: done"));
    }
}
