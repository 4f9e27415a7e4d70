//! File-based chat store: one JSON file per session.
//!
//! Storage location: `~/.llmbind/sessions/<session>.json` by default. A
//! session is loaded lazily on first access and the whole window is written
//! back after every mutation, so the file never holds more than
//! `max_messages` turns.

use async_trait::async_trait;
use llmbind_core::error::MemoryError;
use llmbind_core::memory::ChatMemoryStore;
use llmbind_core::message::{SessionId, Turn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::window::ChatMemoryWindow;

pub struct FileChatStore {
    dir: PathBuf,
    max_messages: usize,
    sessions: RwLock<HashMap<SessionId, ChatMemoryWindow>>,
}

impl FileChatStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, max_messages: usize) -> Self {
        Self {
            dir: dir.into(),
            max_messages,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a session. Characters outside `[A-Za-z0-9_-]` are
    /// percent-encoded so distinct session ids never share a file.
    pub fn session_path(&self, session: &SessionId) -> PathBuf {
        let mut file = String::with_capacity(session.as_str().len() + 5);
        for byte in session.as_str().bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' => file.push(byte as char),
                other => file.push_str(&format!("%{other:02X}")),
            }
        }
        file.push_str(".json");
        self.dir.join(file)
    }

    fn load_from_disk(&self, session: &SessionId) -> ChatMemoryWindow {
        let path = self.session_path(session);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return ChatMemoryWindow::new(self.max_messages), // no history yet
        };

        match serde_json::from_str::<Vec<Turn>>(&content) {
            Ok(turns) => {
                debug!(path = %path.display(), count = turns.len(), "Loaded session history");
                ChatMemoryWindow::from_turns(self.max_messages, turns)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupted session file");
                ChatMemoryWindow::new(self.max_messages)
            }
        }
    }

    fn flush(&self, session: &SessionId, window: &ChatMemoryWindow) -> Result<(), MemoryError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            MemoryError::Storage(format!("Failed to create sessions directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(&window.snapshot()).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize session: {e}"))
        })?;

        std::fs::write(self.session_path(session), content)
            .map_err(|e| MemoryError::Storage(format!("Failed to write session file: {e}")))
    }
}

#[async_trait]
impl ChatMemoryStore for FileChatStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append_all(&self, session: &SessionId, turns: Vec<Turn>) -> Result<(), MemoryError> {
        let mut sessions = self.sessions.write().await;
        let window = sessions
            .entry(session.clone())
            .or_insert_with(|| self.load_from_disk(session));

        // The cached window only moves once the file holds the new turns.
        let mut updated = window.clone();
        updated.extend(turns);
        self.flush(session, &updated)?;
        *window = updated;
        Ok(())
    }

    async fn snapshot(&self, session: &SessionId) -> Result<Vec<Turn>, MemoryError> {
        if let Some(window) = self.sessions.read().await.get(session) {
            return Ok(window.snapshot());
        }

        let mut sessions = self.sessions.write().await;
        let window = sessions
            .entry(session.clone())
            .or_insert_with(|| self.load_from_disk(session));
        Ok(window.snapshot())
    }

    async fn clear(&self, session: &SessionId) -> Result<(), MemoryError> {
        self.sessions.write().await.remove(session);
        let path = self.session_path(session);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to remove session file {}: {e}",
                path.display()
            ))),
        }
    }
}
