//! Domain event system: decoupled observation of assistant activity.
//!
//! Events are published when a model is called, a tool runs, a document is
//! ingested, or an invocation finishes. Subscribers (loggers, metrics, UIs)
//! can react without the orchestration code knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The model backend answered one request
    ModelCalled {
        backend: String,
        model: String,
        round: u32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A document's chunks were (re)placed in the corpus
    DocumentIngested {
        source_id: String,
        chunks: usize,
        replaced: usize,
        timestamp: DateTime<Utc>,
    },

    /// An assistant method returned a value
    InvocationCompleted {
        method: String,
        session: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An assistant method failed
    InvocationFailed {
        method: String,
        session: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
