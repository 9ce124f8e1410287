//! SessionStore trait — session-keyed conversation persistence.
//!
//! The store owns every session's transcript. Appends for the same session
//! are serialized by the implementation so turns stay strictly chronological;
//! reads return a consistent snapshot taken at call time and never block
//! appends from other sessions.
//!
//! Implementations: in-memory (ephemeral), JSONL file (durable).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::turn::{ConversationTurn, SessionId, Transcript};

/// The core SessionStore trait.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Append a turn to a session, creating the session on first use.
    async fn append(
        &self,
        session: &SessionId,
        turn: ConversationTurn,
    ) -> std::result::Result<(), StoreError>;

    /// A consistent snapshot of a session's transcript.
    ///
    /// An unknown session id yields an empty transcript, never an error —
    /// a missing or corrupt session is treated as a fresh one.
    async fn history(&self, session: &SessionId) -> std::result::Result<Transcript, StoreError>;

    /// Reset (delete) a session. Returns whether the session existed.
    async fn reset(&self, session: &SessionId) -> std::result::Result<bool, StoreError>;

    /// All known session ids.
    async fn sessions(&self) -> std::result::Result<Vec<SessionId>, StoreError>;

    /// Total number of turns across all sessions.
    async fn count(&self) -> std::result::Result<usize, StoreError>;
}
