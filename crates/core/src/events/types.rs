use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::job::{ErrorInfo, JobState};

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Warning => "WARNING",
            EventLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch run events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        run_id: String,
        character_image: PathBuf,
        total_clips: usize,
    },
    /// A clip's job moved between states.
    StateChanged {
        clip: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        job_id: Option<String>,
        from: JobState,
        to: JobState,
        /// Submission attempt the transition belongs to.
        attempt: u32,
    },
    /// Existing output kept, nothing submitted.
    ClipReused {
        clip: String,
        output_path: PathBuf,
    },
    ClipFinished {
        clip: String,
        state: JobState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output_path: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorInfo>,
        attempts: u32,
    },
    BatchFinished {
        run_id: String,
        succeeded: usize,
        total: usize,
        cancelled: bool,
    },
    /// The batch could not start.
    BatchAborted {
        reason: String,
    },
}

impl BatchEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "batch_started",
            Self::StateChanged { .. } => "state_changed",
            Self::ClipReused { .. } => "clip_reused",
            Self::ClipFinished { .. } => "clip_finished",
            Self::BatchFinished { .. } => "batch_finished",
            Self::BatchAborted { .. } => "batch_aborted",
        }
    }

    /// Audio clip file name for per-clip events.
    pub fn clip(&self) -> Option<&str> {
        match self {
            Self::StateChanged { clip, .. }
            | Self::ClipReused { clip, .. }
            | Self::ClipFinished { clip, .. } => Some(clip),
            Self::BatchStarted { .. }
            | Self::BatchFinished { .. }
            | Self::BatchAborted { .. } => None,
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            Self::StateChanged { to, .. } => match to {
                JobState::Failed => EventLevel::Warning,
                JobState::TimedOut => EventLevel::Error,
                _ => EventLevel::Info,
            },
            Self::ClipFinished { state, .. } => {
                if *state == JobState::Succeeded {
                    EventLevel::Info
                } else {
                    EventLevel::Error
                }
            }
            Self::BatchFinished {
                succeeded,
                total,
                cancelled,
                ..
            } => {
                if succeeded == total && !cancelled {
                    EventLevel::Info
                } else {
                    EventLevel::Warning
                }
            }
            Self::BatchAborted { .. } => EventLevel::Error,
            Self::BatchStarted { .. } | Self::ClipReused { .. } => EventLevel::Info,
        }
    }

    /// One human-readable log line.
    pub fn message(&self) -> String {
        match self {
            Self::BatchStarted {
                run_id,
                character_image,
                total_clips,
            } => format!(
                "Batch {} started: {} clip(s), character image {}",
                run_id,
                total_clips,
                character_image.display()
            ),
            Self::StateChanged {
                clip,
                job_id,
                from,
                to,
                attempt,
            } => match job_id {
                Some(id) => format!(
                    "{}: {} -> {} (attempt {}, job {})",
                    clip, from, to, attempt, id
                ),
                None => format!("{}: {} -> {} (attempt {})", clip, from, to, attempt),
            },
            Self::ClipReused { clip, output_path } => format!(
                "{}: output {} already exists, skipped",
                clip,
                output_path.display()
            ),
            Self::ClipFinished {
                clip,
                state,
                output_path,
                error,
                ..
            } => match (output_path, error) {
                (Some(path), _) if *state == JobState::Succeeded => {
                    format!("{}: video saved to {}", clip, path.display())
                }
                (_, Some(error)) => format!("{}: {}: {}", clip, state, error),
                _ => format!("{}: {}", clip, state),
            },
            Self::BatchFinished {
                succeeded,
                total,
                cancelled,
                ..
            } => {
                if *cancelled {
                    format!("Batch finished: {}/{} succeeded (cancelled)", succeeded, total)
                } else {
                    format!("Batch finished: {}/{} succeeded", succeeded, total)
                }
            }
            Self::BatchAborted { reason } => format!("Batch processing failed: {}", reason),
        }
    }
}
