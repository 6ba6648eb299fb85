//! Core job data types.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a generation job.
///
/// State machine flow:
/// ```text
/// Pending -> Submitted -> Polling -> Succeeded
///    |           |           |
///    v           v           v
///  Failed      Failed     Failed / TimedOut
///
/// Failed -> Submitted (retry, only while attempts remain)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, nothing sent yet.
    Pending,
    /// Accepted by the remote service, not polled yet.
    Submitted,
    /// Being polled for completion.
    Polling,
    /// Video retrieved and written (terminal).
    Succeeded,
    /// Failed; may be resubmitted while attempts remain.
    Failed,
    /// Poll budget exhausted (terminal, never retried).
    TimedOut,
}

impl JobState {
    /// Returns true for `Succeeded`, `Failed` and `TimedOut`.
    ///
    /// `Failed` is only left again through an explicit retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Submitted => "submitted",
            JobState::Polling => "polling",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the job state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobEvent {
    SubmitOk,
    SubmitFail,
    PollRunning,
    PollDone,
    PollFail,
    Timeout,
}

impl JobEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEvent::SubmitOk => "submit_ok",
            JobEvent::SubmitFail => "submit_fail",
            JobEvent::PollRunning => "poll_running",
            JobEvent::PollDone => "poll_done",
            JobEvent::PollFail => "poll_fail",
            JobEvent::Timeout => "timeout",
        }
    }

    /// Whether this event counts as a submission attempt.
    pub fn is_submission(&self) -> bool {
        matches!(self, JobEvent::SubmitOk | JobEvent::SubmitFail)
    }
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a per-clip failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Remote rejected the request (4xx); bad input.
    Submission,
    /// Network failure, rate limit, or 5xx.
    Transient,
    /// Remote reported the generation as failed.
    GenerationFailed,
    /// Unexpected or malformed remote response.
    Protocol,
    /// Result payload missing or corrupt.
    Fetch,
    /// Writing the output video failed.
    FileSystem,
    /// Poll budget exhausted.
    Timeout,
    /// Batch interrupted while this clip was in flight.
    Cancelled,
    /// Job state machine rejected a transition.
    Internal,
}

impl ErrorKind {
    /// Whether a clip failing with this kind may be resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transient | ErrorKind::GenerationFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Submission => "submission_error",
            ErrorKind::Transient => "transient_error",
            ErrorKind::GenerationFailed => "generation_failed",
            ErrorKind::Protocol => "protocol_error",
            ErrorKind::Fetch => "fetch_error",
            ErrorKind::FileSystem => "file_system_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded per-clip error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    /// Submission attempts made when the error was recorded.
    pub attempts: u32,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>, attempts: u32) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts,
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (after {} attempt{})",
            self.kind,
            self.message,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" }
        )
    }
}

/// One applied state transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    pub from: JobState,
    pub event: JobEvent,
    pub to: JobState,
    pub at: DateTime<Utc>,
}

/// Generation job for one audio clip.
///
/// Owned by the orchestrator for the duration of the clip; the remote client
/// only ever sees the paths and the remote id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Remote-assigned id, absent until the first successful submission.
    pub id: Option<String>,
    pub audio_clip: PathBuf,
    pub character_image: PathBuf,
    pub prompt: String,
    pub(super) state: JobState,
    pub(super) attempts: u32,
    pub(super) max_attempts: u32,
    pub last_error: Option<ErrorInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub(super) history: Vec<Transition>,
}

impl GenerationJob {
    /// Create a job in `Pending`.
    pub fn new(
        audio_clip: impl Into<PathBuf>,
        character_image: impl Into<PathBuf>,
        prompt: impl Into<String>,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            audio_clip: audio_clip.into(),
            character_image: character_image.into(),
            prompt: prompt.into(),
            state: JobState::Pending,
            attempts: 0,
            max_attempts,
            last_error: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Submission attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// File name of the audio clip, for logs and reports.
    pub fn clip_name(&self) -> String {
        clip_name(&self.audio_clip)
    }

    /// Record an error against the current attempt count.
    pub fn record_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> ErrorInfo {
        let info = ErrorInfo::new(kind, message, self.attempts);
        self.last_error = Some(info.clone());
        self.updated_at = Utc::now();
        info
    }
}

/// File name of a path, falling back to the full path.
pub(crate) fn clip_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
