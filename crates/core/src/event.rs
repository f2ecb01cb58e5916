//! Domain event system: decoupled observation of the request pipeline.
//!
//! Events are published when something interesting happens to a request.
//! Other components can subscribe to react without tight coupling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A question entered the orchestrator
    QuestionReceived {
        session: String,
        content_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// Grounding documents were looked up
    GroundingResolved {
        session: String,
        documents: usize,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },

    /// A tool was invoked through the tool seam
    ToolInvoked {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The final answer was produced and persisted
    AnswerGenerated {
        session: String,
        model: String,
        tool_rounds: u32,
        timestamp: DateTime<Utc>,
    },

    /// The request was aborted
    RequestFailed {
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
