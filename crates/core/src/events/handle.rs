use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::BatchEvent;

/// Envelope wrapping a batch event with its emission time
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: BatchEvent,
}

impl EventEnvelope {
    /// Stamp `event` with the current time.
    pub fn new(event: BatchEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Handle for emitting batch events
///
/// Cheap to clone. Emission never fails the caller: a closed channel is
/// reported through `tracing` and the event is dropped.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventHandle {
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    pub async fn emit(&self, event: BatchEvent) {
        if let Err(e) = self.tx.send(EventEnvelope::new(event)).await {
            tracing::error!("Failed to emit batch event: {}", e);
        }
    }
}
