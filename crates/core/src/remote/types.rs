//! Types for remote job client operations.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::ErrorKind;

/// Errors that can occur during remote job operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The service rejected the request (HTTP 4xx). Not retryable.
    #[error("Submission rejected (HTTP {status}): {message}")]
    Submission { status: u16, message: String },

    /// Connection failure, timeout, rate limit or server error. Retryable.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Result payload missing or corrupt.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Response did not match the expected protocol.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Reading a local input file failed.
    #[error("Failed to read input file: {0}")]
    Input(String),

    /// The client could not be constructed.
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl RemoteError {
    /// Create a submission error from status code and message
    pub fn submission(status: u16, message: impl Into<String>) -> Self {
        Self::Submission {
            status,
            message: message.into(),
        }
    }

    /// Whether the failed operation may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Per-clip error category for reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Submission { .. } | Self::Input(_) => ErrorKind::Submission,
            Self::Transient(_) => ErrorKind::Transient,
            Self::Fetch(_) => ErrorKind::Fetch,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Configuration(_) => ErrorKind::Internal,
        }
    }
}

/// Remote status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Queued or generating.
    Running,
    /// Finished; the result can be fetched.
    Done,
    /// Generation failed on the remote side.
    Failed,
}

impl PollStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollStatus::Running => "running",
            PollStatus::Done => "done",
            PollStatus::Failed => "failed",
        }
    }
}

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub status: PollStatus,
    /// Progress (0.0 - 1.0) when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    /// Failure detail when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PollResponse {
    pub fn running() -> Self {
        Self {
            status: PollStatus::Running,
            progress: None,
            message: None,
        }
    }

    pub fn done() -> Self {
        Self {
            status: PollStatus::Done,
            progress: Some(1.0),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: PollStatus::Failed,
            progress: None,
            message: Some(message.into()),
        }
    }

    pub fn with_progress(mut self, progress: f32) -> Self {
        self.progress = Some(progress.clamp(0.0, 1.0));
        self
    }
}

/// Trait for remote generation backends.
///
/// Implementations perform network calls only and never write local files.
/// Every method is a single round trip; polling cadence belongs to the caller.
#[async_trait]
pub trait RemoteJobClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Upload the inputs and start a generation job. Returns the job id.
    async fn submit(
        &self,
        character_image: &Path,
        audio_clip: &Path,
        prompt: &str,
    ) -> Result<String, RemoteError>;

    /// Check a job's status once.
    async fn poll(&self, job_id: &str) -> Result<PollResponse, RemoteError>;

    /// Download the finished video.
    async fn fetch_result(&self, job_id: &str) -> Result<Vec<u8>, RemoteError>;
}
