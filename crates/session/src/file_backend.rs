//! File-based session store — persistent JSONL storage.
//!
//! One JSON-encoded record per line, each carrying the session id and a
//! single turn. Records are loaded into memory on creation and the file is
//! rewritten on every mutation, giving fast reads with durable writes.
//!
//! Storage location: `~/.fuente/sessions.jsonl`
//!
//! A missing file starts empty; corrupted lines are skipped with a warning
//! (a damaged history file must never take the assistant down).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use fuente_core::error::StoreError;
use fuente_core::store::SessionStore;
use fuente_core::turn::{ConversationTurn, SessionId, Transcript};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One line of the JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnRecord {
    session_id: String,
    #[serde(flatten)]
    turn: ConversationTurn,
}

/// A file-backed session store.
pub struct FileStore {
    path: PathBuf,
    sessions: RwLock<HashMap<SessionId, Transcript>>,
}

impl FileStore {
    /// Create a new file-backed store at the given path.
    ///
    /// If the file exists, records are loaded from it; otherwise the store
    /// starts empty and the file is created on first write.
    pub fn new(path: PathBuf) -> Self {
        let sessions = Self::load_from_disk(&path);
        debug!(
            path = %path.display(),
            sessions = sessions.len(),
            "File session store loaded"
        );
        Self {
            path,
            sessions: RwLock::new(sessions),
        }
    }

    fn load_from_disk(path: &PathBuf) -> HashMap<SessionId, Transcript> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(), // File doesn't exist yet — start empty
        };

        let mut sessions: HashMap<SessionId, Transcript> = HashMap::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<TurnRecord>(line) {
                Ok(record) => {
                    sessions
                        .entry(SessionId(record.session_id))
                        .or_default()
                        .push(record.turn);
                }
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted session record");
                }
            }
        }
        sessions
    }

    /// Rewrite the whole file from the in-memory state.
    ///
    /// Callers must already hold the write lock.
    fn flush(&self, sessions: &HashMap<SessionId, Transcript>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Storage(format!("Failed to create session directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for (session, transcript) in sessions.iter() {
            for turn in &transcript.turns {
                let record = TurnRecord {
                    session_id: session.0.clone(),
                    turn: turn.clone(),
                };
                let line = serde_json::to_string(&record).map_err(|e| {
                    StoreError::Serialization(format!("Failed to serialize turn: {e}"))
                })?;
                content.push_str(&line);
                content.push('\n');
            }
        }

        std::fs::write(&self.path, &content)
            .map_err(|e| StoreError::Storage(format!("Failed to write session file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(
        &self,
        session: &SessionId,
        turn: ConversationTurn,
    ) -> Result<(), StoreError> {
        // The store-wide write lock doubles as the append critical section:
        // the backing file is shared by all sessions.
        let mut sessions = self.sessions.write().await;
        sessions.entry(session.clone()).or_default().push(turn);
        self.flush(&sessions)
    }

    async fn history(&self, session: &SessionId) -> Result<Transcript, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session).cloned().unwrap_or_default())
    }

    async fn reset(&self, session: &SessionId) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(session).is_some();
        if removed {
            self.flush(&sessions)?;
        }
        Ok(removed)
    }

    async fn sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().map(|t| t.len()).sum())
    }
}
