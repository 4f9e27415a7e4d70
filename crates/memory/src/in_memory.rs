//! In-memory chat store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use llmbind_core::error::MemoryError;
use llmbind_core::memory::ChatMemoryStore;
use llmbind_core::message::{SessionId, Turn};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::window::ChatMemoryWindow;

/// Keeps one `ChatMemoryWindow` per session in a map.
pub struct InMemoryChatStore {
    max_messages: usize,
    sessions: RwLock<HashMap<SessionId, ChatMemoryWindow>>,
}

impl InMemoryChatStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            max_messages,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Number of sessions that have at least one stored turn.
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|w| !w.is_empty())
            .count()
    }
}

#[async_trait]
impl ChatMemoryStore for InMemoryChatStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> Result<(), MemoryError> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.clone())
            .or_insert_with(|| ChatMemoryWindow::new(self.max_messages))
            .extend(turns);
        Ok(())
    }

    async fn snapshot(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session)
            .map(ChatMemoryWindow::snapshot)
            .unwrap_or_default())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), MemoryError> {
        self.sessions.write().await.remove(session);
        Ok(())
    }
}
