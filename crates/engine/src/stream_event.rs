//! Streaming chat events.
//!
//! `ChatStreamEvent` wraps generation chunks and the citation payload into
//! the events the gateway forwards to clients over SSE:
//! - `chunk`   — partial answer text
//! - `sources` — the selected citation set (sent once, after the answer)
//! - `done`    — stream complete, with final metadata
//! - `error`   — an error occurred mid-stream

use fuente_core::source::ScoredSource;
use serde::{Deserialize, Serialize};

/// Events emitted by the chat engine during streaming execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Partial answer text.
    Chunk { content: String },

    /// The citation set selected for this answer.
    Sources { sources: Vec<ScoredSource> },

    /// The stream is complete.
    Done {
        session_id: String,
        is_follow_up: bool,
        degraded: bool,
    },

    /// An error occurred mid-stream.
    Error { message: String },
}

impl ChatStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Sources { .. } => "sources",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_serialization() {
        let event = ChatStreamEvent::Chunk {
            content: "Hola".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hola""#));
    }

    #[test]
    fn done_serialization() {
        let event = ChatStreamEvent::Done {
            session_id: "abc".into(),
            is_follow_up: true,
            degraded: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""is_follow_up":true"#));
    }

    #[test]
    fn event_type_names() {
        assert_eq!(
            ChatStreamEvent::Chunk {
                content: "x".into()
            }
            .event_type(),
            "chunk"
        );
        assert_eq!(
            ChatStreamEvent::Sources { sources: vec![] }.event_type(),
            "sources"
        );
        assert_eq!(
            ChatStreamEvent::Done {
                session_id: "x".into(),
                is_follow_up: false,
                degraded: false
            }
            .event_type(),
            "done"
        );
        assert_eq!(
            ChatStreamEvent::Error {
                message: "x".into()
            }
            .event_type(),
            "error"
        );
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"chunk","content":"hi"}"#;
        let event: ChatStreamEvent = serde_json::from_str(json).unwrap();
        match event {
            ChatStreamEvent::Chunk { content } => assert_eq!(content, "hi"),
            _ => panic!("Wrong variant"),
        }
    }
}
