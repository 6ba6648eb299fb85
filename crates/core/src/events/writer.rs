use std::sync::Arc;

use tokio::sync::mpsc;

use super::{EventEnvelope, EventHandle, EventSink};

/// Background task that receives batch events and appends them to a sink
pub struct EventWriter {
    rx: mpsc::Receiver<EventEnvelope>,
    sink: Arc<dyn EventSink>,
}

impl EventWriter {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>, sink: Arc<dyn EventSink>) -> Self {
        Self { rx, sink }
    }

    /// Run the writer, consuming events until every handle is dropped.
    ///
    /// Spawn with `tokio::spawn(writer.run())`.
    pub async fn run(mut self) {
        tracing::debug!("Event writer started");

        while let Some(envelope) = self.rx.recv().await {
            if let Err(e) = self.sink.append(&envelope) {
                tracing::error!(
                    "Failed to write {} event: {}",
                    envelope.event.event_type(),
                    e
                );
            }
        }

        tracing::debug!("Event writer shutting down");
    }
}

/// Create a complete event system
///
/// Returns the [`EventHandle`] to clone into producers and the
/// [`EventWriter`] to spawn. Emission waits when `buffer_size` events are
/// queued.
pub fn create_event_system(
    sink: Arc<dyn EventSink>,
    buffer_size: usize,
) -> (EventHandle, EventWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (EventHandle::new(tx), EventWriter::new(rx, sink))
}
