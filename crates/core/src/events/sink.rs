use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::SecondsFormat;
use thiserror::Error;

use super::EventEnvelope;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to open run log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write run log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Run log lock poisoned")]
    Poisoned,
}

/// Destination for batch events
pub trait EventSink: Send + Sync {
    fn append(&self, envelope: &EventEnvelope) -> Result<(), EventError>;
}

/// Render an event as `<timestamp> - <LEVEL> - <message>`.
pub fn format_line(envelope: &EventEnvelope) -> String {
    format!(
        "{} - {} - {}",
        envelope
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        envelope.event.level(),
        envelope.event.message()
    )
}

/// Appends event lines to a log file.
pub struct FileEventSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileEventSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EventError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| EventError::Open {
                path: path.clone(),
                source: e,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileEventSink {
    fn append(&self, envelope: &EventEnvelope) -> Result<(), EventError> {
        let mut file = self.file.lock().map_err(|_| EventError::Poisoned)?;
        writeln!(file, "{}", format_line(envelope))?;
        file.flush()?;
        Ok(())
    }
}
