//! In-memory session store — the default backend.
//!
//! Each session's transcript lives behind its own lock, so appends for the
//! same session serialize (preserving chronological order) while requests for
//! different sessions never contend. Reads clone a snapshot taken at call
//! time; an in-flight ranking pass is never affected by a concurrent append.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fuente_core::error::StoreError;
use fuente_core::store::SessionStore;
use fuente_core::turn::{ConversationTurn, SessionId, Transcript};
use tokio::sync::{Mutex, RwLock};

/// An in-memory store keyed by session id.
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Transcript>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the per-session transcript cell, creating it on first use.
    async fn cell(&self, session: &SessionId) -> Arc<Mutex<Transcript>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(cell) = sessions.get(session) {
                return cell.clone();
            }
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Transcript::new())))
            .clone()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(
        &self,
        session: &SessionId,
        turn: ConversationTurn,
    ) -> Result<(), StoreError> {
        let cell = self.cell(session).await;
        // Per-session exclusive critical section around the append.
        cell.lock().await.push(turn);
        Ok(())
    }

    async fn history(&self, session: &SessionId) -> Result<Transcript, StoreError> {
        let sessions = self.sessions.read().await;
        match sessions.get(session) {
            Some(cell) => Ok(cell.lock().await.clone()),
            // Unknown session — treated as a fresh one.
            None => Ok(Transcript::new()),
        }
    }

    async fn reset(&self, session: &SessionId) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(session).is_some())
    }

    async fn sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let sessions = self.sessions.read().await;
        let mut total = 0;
        for cell in sessions.values() {
            total += cell.lock().await.len();
        }
        Ok(total)
    }
}
