//! # Outcome Events
//!
//! Broadcast publisher for batch outcome events. The scheduler reports every
//! tick here (`batch.completed`, `batch.no_work`, `batch.failed`) with a JSON
//! context so observability consumers can subscribe without being wired into
//! the processing path. Publishing with no subscribers is not an error.

use serde_json::Value;
use tokio::sync::broadcast;

/// Event names published by the pipeline
pub mod names {
    pub const BATCH_COMPLETED: &str = "batch.completed";
    pub const BATCH_NO_WORK: &str = "batch.no_work";
    pub const BATCH_FAILED: &str = "batch.failed";
    pub const INDEX_COMPLETED: &str = "index.completed";
}

/// High-throughput publisher for pipeline lifecycle events
#[derive(Debug, Clone)]
pub struct OutcomePublisher {
    sender: broadcast::Sender<OutcomeEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct OutcomeEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl OutcomePublisher {
    /// Create a new publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context.
    ///
    /// A send with no live subscribers is accepted silently; outcome events
    /// are observability, not control flow.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = OutcomeEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<OutcomeEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for OutcomePublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}
