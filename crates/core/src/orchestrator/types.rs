//! Types for the batch orchestrator.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::input::InputError;
use crate::job::{clip_name, ErrorInfo, ErrorKind, JobState};

/// Errors that abort a whole batch.
///
/// Everything that goes wrong for a single clip is recorded in the
/// [`BatchReport`] instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid input folder: {0}")]
    Input(#[from] InputError),
}

/// A clip whose video exists in the output folder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SucceededClip {
    pub audio_clip: PathBuf,
    pub output_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub attempts: u32,
    /// Output already existed; nothing was submitted.
    pub reused: bool,
}

/// A clip that ended in `Failed` or `TimedOut`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedClip {
    pub audio_clip: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub final_state: JobState,
    pub error: ErrorInfo,
}

/// One line of the printed outcome table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRow {
    pub clip: String,
    pub status: &'static str,
    pub detail: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of audio clips in the input set.
    pub total: usize,
    pub succeeded: Vec<SucceededClip>,
    pub failed: Vec<FailedClip>,
    /// Clips skipped because the batch was cancelled before reaching them.
    pub not_attempted: Vec<PathBuf>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    /// True iff every clip has its video and the run was not cut short.
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled
            && self.failed.is_empty()
            && self.not_attempted.is_empty()
            && self.succeeded.len() == self.total
    }

    /// `"X/N succeeded"`.
    pub fn summary(&self) -> String {
        format!("{}/{} succeeded", self.succeeded.len(), self.total)
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Per-clip rows in processing order, unstarted clips last.
    pub fn outcome_rows(&self) -> Vec<OutcomeRow> {
        let mut rows: Vec<(PathBuf, OutcomeRow)> = self
            .succeeded
            .iter()
            .map(|s| {
                (
                    s.audio_clip.clone(),
                    OutcomeRow {
                        clip: clip_name(&s.audio_clip),
                        status: if s.reused { "reused" } else { "succeeded" },
                        detail: s.output_path.display().to_string(),
                    },
                )
            })
            .chain(self.failed.iter().map(|f| {
                (
                    f.audio_clip.clone(),
                    OutcomeRow {
                        clip: clip_name(&f.audio_clip),
                        status: f.final_state.as_str(),
                        detail: f.error.to_string(),
                    },
                )
            }))
            .collect();
        rows.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()));

        rows.into_iter()
            .map(|(_, row)| row)
            .chain(self.not_attempted.iter().map(|p| OutcomeRow {
                clip: clip_name(p),
                status: "not_attempted",
                detail: "batch cancelled".to_string(),
            }))
            .collect()
    }
}

/// Accumulates clip outcomes during a run.
pub(crate) struct ReportBuilder {
    run_id: String,
    started_at: DateTime<Utc>,
    total: usize,
    succeeded: Vec<SucceededClip>,
    failed: Vec<FailedClip>,
    not_attempted: Vec<PathBuf>,
}

impl ReportBuilder {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            total,
            succeeded: Vec::new(),
            failed: Vec::new(),
            not_attempted: Vec::new(),
        }
    }

    pub(crate) fn run_id(&self) -> &str {
        &self.run_id
    }

    pub(crate) fn succeeded(&mut self, clip: SucceededClip) {
        self.succeeded.push(clip);
    }

    pub(crate) fn failed(&mut self, clip: FailedClip) {
        self.failed.push(clip);
    }

    pub(crate) fn not_attempted(&mut self, clips: &[PathBuf]) {
        self.not_attempted.extend_from_slice(clips);
    }

    pub(crate) fn finish(self) -> BatchReport {
        let cancelled = !self.not_attempted.is_empty()
            || self
                .failed
                .iter()
                .any(|f| f.error.kind == ErrorKind::Cancelled);

        BatchReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            not_attempted: self.not_attempted,
            cancelled,
        }
    }
}

/// Cooperative cancellation for a running batch.
///
/// Cloneable; cancelling any clone cancels all of them. Waiting in
/// [`CancelHandle::sleep`] wakes up immediately on cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
    notify_tx: broadcast::Sender<()>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (notify_tx, _) = broadcast::channel(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify_tx,
        }
    }

    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            let _ = self.notify_tx.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`. Returns `false` if cancelled before it elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut notify_rx = self.notify_tx.subscribe();
        if self.is_cancelled() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
            _ = notify_rx.recv() => false,
        }
    }
}
