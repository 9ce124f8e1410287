//! Conversation turn and transcript domain types.
//!
//! These are the core value objects that flow through the system:
//! User sends an utterance → engine reformulates it against the transcript →
//! answer is generated → both turns are appended to the session transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

/// A single turn in a conversation. Immutable once appended to a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who authored this turn
    pub role: Role,

    /// The text content
    pub text: String,

    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,

    /// URLs of the sources cited by an assistant turn, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_urls: Vec<String>,
}

impl ConversationTurn {
    /// Create a new user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
            cited_urls: Vec::new(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            cited_urls: Vec::new(),
        }
    }

    /// Attach the URLs the assistant cited in this turn.
    pub fn with_cited_urls(mut self, urls: Vec<String>) -> Self {
        self.cited_urls = urls;
        self
    }
}

/// A transcript is the ordered, append-only sequence of turns for one session.
///
/// Turns are strictly chronological; no turn is ever mutated or removed except
/// by explicit session reset. A `Transcript` value is a consistent snapshot —
/// stores hand out clones, so concurrent appends never mutate a snapshot a
/// request is already reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    /// Ordered turns, most recent last.
    pub turns: Vec<ConversationTurn>,
}

impl Transcript {
    /// Create a new empty transcript.
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn, preserving chronological order.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Whether the session has any prior turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// The last `n` turns, oldest first — the bounded window handed to the
    /// rewrite collaborator.
    pub fn last_window(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }
}
