//! Domain event system — decoupled observation of the orchestration loop.
//!
//! The loop publishes events as it moves between states; the CLI and tests
//! subscribe without the loop knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A turn entered the loop (user message or tool result)
    TurnReceived {
        conversation_id: String,
        role: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was invoked on the model's behalf
    ToolInvoked {
        conversation_id: String,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The model produced a terminal reply
    ReplyGenerated {
        conversation_id: String,
        model: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        timestamp: DateTime<Utc>,
    },

    /// A completion could not be used; a failure notice was sent
    CompletionFailed {
        conversation_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
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
