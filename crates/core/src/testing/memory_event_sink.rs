//! In-memory event sink for testing.

use std::sync::{Arc, Mutex};

use crate::events::{format_line, BatchEvent, EventEnvelope, EventError, EventSink};

/// Collects events in memory instead of writing a log file.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    envelopes: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Events rendered exactly as the file sink would write them.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().map(format_line).collect()
    }

    /// Event type names in emission order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.lock().iter().map(|e| e.event.event_type()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<EventEnvelope>> {
        self.envelopes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for MemoryEventSink {
    fn append(&self, envelope: &EventEnvelope) -> Result<(), EventError> {
        self.envelopes
            .lock()
            .map_err(|_| EventError::Poisoned)?
            .push(envelope.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_collects_events() {
        let sink = MemoryEventSink::new();
        sink.append(&EventEnvelope {
            timestamp: Utc::now(),
            event: BatchEvent::BatchFinished {
                run_id: "r".to_string(),
                succeeded: 0,
                total: 1,
                cancelled: true,
            },
        })
        .unwrap();

        assert_eq!(sink.event_types(), vec!["batch_finished"]);
        assert!(sink.lines()[0].ends_with("WARNING - Batch finished: 0/1 succeeded (cancelled)"));
    }
}
