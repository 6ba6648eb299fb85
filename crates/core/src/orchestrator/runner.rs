//! Batch orchestrator implementation.
//!
//! Clips are processed one at a time in input order. Each clip goes through
//! submit, poll and fetch under the job state machine; any per-clip failure is
//! recorded and the batch moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::InputConfig;
use crate::events::{BatchEvent, EventHandle};
use crate::input::{self, InputSet};
use crate::job::{
    clip_name, ErrorKind, GenerationJob, IllegalTransitionError, JobEvent, JobState,
};
use crate::remote::{PollStatus, RemoteJobClient};
use crate::writer::ResultWriter;

use super::config::OrchestratorConfig;
use super::types::{
    BatchReport, CancelHandle, FailedClip, OrchestratorError, ReportBuilder, SucceededClip,
};

/// Terminal result of processing one clip.
enum ClipOutcome {
    Succeeded(SucceededClip),
    Failed(FailedClip),
}

/// Drives every clip of an input set through generation.
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    client: Arc<dyn RemoteJobClient>,
    writer: Arc<dyn ResultWriter>,
    events: Option<EventHandle>,
    cancel: CancelHandle,
}

impl BatchOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        client: Arc<dyn RemoteJobClient>,
        writer: Arc<dyn ResultWriter>,
        events: Option<EventHandle>,
    ) -> Self {
        Self {
            config,
            client,
            writer,
            events,
            cancel: CancelHandle::new(),
        }
    }

    /// Handle that stops the batch at the next safe boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Resolve `input_dir` and run the batch.
    ///
    /// Fails only when the input folder is unusable, before any remote call.
    pub async fn run_directory(
        &self,
        input_dir: &Path,
        input_config: &InputConfig,
        prompt: &str,
        output_dir: &Path,
    ) -> Result<BatchReport, OrchestratorError> {
        let input = input::resolve(input_dir, input_config)?;
        Ok(self.run(&input, prompt, output_dir).await)
    }

    /// Process every clip of `input`. Never fails; see the report.
    pub async fn run(&self, input: &InputSet, prompt: &str, output_dir: &Path) -> BatchReport {
        let clips = input.audio_clips();
        let mut report = ReportBuilder::new(clips.len());

        info!(
            "Starting batch {} with {} clip(s) using {} backend and {} writer",
            report.run_id(),
            clips.len(),
            self.client.name(),
            self.writer.name()
        );
        self.emit(BatchEvent::BatchStarted {
            run_id: report.run_id().to_string(),
            character_image: input.character_image().to_path_buf(),
            total_clips: clips.len(),
        })
        .await;

        for (idx, clip) in clips.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Batch cancelled, {} clip(s) not attempted",
                    clips.len() - idx
                );
                report.not_attempted(&clips[idx..]);
                break;
            }

            info!(
                "Processing clip {}/{}: {}",
                idx + 1,
                clips.len(),
                clip_name(clip)
            );

            match self
                .process_clip(clip, input.character_image(), prompt, output_dir)
                .await
            {
                ClipOutcome::Succeeded(done) => report.succeeded(done),
                ClipOutcome::Failed(failed) => report.failed(failed),
            }
        }

        let report = report.finish();
        info!("Batch {} finished: {}", report.run_id, report.summary());
        self.emit(BatchEvent::BatchFinished {
            run_id: report.run_id.clone(),
            succeeded: report.succeeded_count(),
            total: report.total,
            cancelled: report.cancelled,
        })
        .await;

        report
    }

    /// Process one clip to a terminal outcome.
    async fn process_clip(
        &self,
        clip: &Path,
        character_image: &Path,
        prompt: &str,
        output_dir: &Path,
    ) -> ClipOutcome {
        if let Some(existing) = self.writer.reusable_output(clip, output_dir).await {
            info!(
                "{}: keeping existing {}",
                clip_name(clip),
                existing.display()
            );
            self.emit(BatchEvent::ClipReused {
                clip: clip_name(clip),
                output_path: existing.clone(),
            })
            .await;
            return ClipOutcome::Succeeded(SucceededClip {
                audio_clip: clip.to_path_buf(),
                output_path: existing,
                job_id: None,
                attempts: 0,
                reused: true,
            });
        }

        let mut job = GenerationJob::new(
            clip,
            character_image,
            prompt,
            self.config.max_attempts,
        );

        let output_path = match self.drive(&mut job, output_dir).await {
            Ok(path) => path,
            Err(e) => {
                error!("{}: {}", job.clip_name(), e);
                job.record_error(ErrorKind::Internal, e.to_string());
                None
            }
        };

        let outcome = match (job.state(), output_path) {
            (JobState::Succeeded, Some(output_path)) => ClipOutcome::Succeeded(SucceededClip {
                audio_clip: clip.to_path_buf(),
                output_path,
                job_id: job.id.clone(),
                attempts: job.attempts(),
                reused: false,
            }),
            (state, _) => {
                let error = job.last_error.clone().unwrap_or_else(|| {
                    job.record_error(ErrorKind::Internal, format!("clip ended in {}", state))
                });
                ClipOutcome::Failed(FailedClip {
                    audio_clip: clip.to_path_buf(),
                    job_id: job.id.clone(),
                    final_state: state,
                    error,
                })
            }
        };

        self.emit_finished(&job, &outcome).await;
        outcome
    }

    /// Run the submit/poll/retry loop. Returns the output path on success.
    async fn drive(
        &self,
        job: &mut GenerationJob,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, IllegalTransitionError> {
        loop {
            match self
                .client
                .submit(&job.character_image, &job.audio_clip, &job.prompt)
                .await
            {
                Ok(job_id) => {
                    debug!("{}: submitted as {}", job.clip_name(), job_id);
                    job.id = Some(job_id);
                    self.apply(job, JobEvent::SubmitOk).await?;

                    if let Some(path) = self.poll_until_terminal(job, output_dir).await? {
                        return Ok(Some(path));
                    }
                }
                Err(e) => {
                    warn!("{}: submission failed: {}", job.clip_name(), e);
                    self.apply(job, JobEvent::SubmitFail).await?;
                    job.record_error(e.kind(), e.to_string());
                }
            }

            let retryable = job
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind.is_retryable());
            if !job.should_retry() || !retryable {
                return Ok(None);
            }

            let delay = self.config.backoff_delay(job.attempts());
            info!(
                "{}: retrying in {:?} (attempt {}/{})",
                job.clip_name(),
                delay,
                job.attempts() + 1,
                job.max_attempts()
            );
            if !self.cancel.sleep(delay).await {
                job.record_error(ErrorKind::Cancelled, "batch cancelled before retry");
                return Ok(None);
            }
        }
    }

    /// Poll a submitted job until it succeeds, fails or runs out of time.
    ///
    /// Returns the written output path when the job succeeded.
    async fn poll_until_terminal(
        &self,
        job: &mut GenerationJob,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, IllegalTransitionError> {
        let Some(job_id) = job.id.clone() else {
            job.record_error(ErrorKind::Internal, "submitted job has no id");
            return Ok(None);
        };
        let deadline = Instant::now() + self.config.job_timeout();

        loop {
            match self.client.poll(&job_id).await {
                Ok(response) => {
                    self.apply(job, JobEvent::PollRunning).await?;
                    debug!(
                        "{}: job {} is {} ({:.0}%)",
                        job.clip_name(),
                        job_id,
                        response.status.as_str(),
                        response.progress.unwrap_or(0.0) * 100.0
                    );

                    match response.status {
                        PollStatus::Running => {}
                        PollStatus::Done => {
                            return self.collect(job, &job_id, output_dir).await;
                        }
                        PollStatus::Failed => {
                            let message = response
                                .message
                                .unwrap_or_else(|| "generation failed".to_string());
                            self.fail_poll(job, ErrorKind::GenerationFailed, message)
                                .await?;
                            return Ok(None);
                        }
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!("{}: status check failed: {}", job.clip_name(), e);
                }
                Err(e) => {
                    self.fail_poll(job, e.kind(), e.to_string()).await?;
                    return Ok(None);
                }
            }

            if self.cancel.is_cancelled() {
                self.fail_poll(job, ErrorKind::Cancelled, "batch cancelled while polling")
                    .await?;
                return Ok(None);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.apply(job, JobEvent::Timeout).await?;
                job.record_error(
                    ErrorKind::Timeout,
                    format!(
                        "job {} still running after {}s",
                        job_id, self.config.job_timeout_secs
                    ),
                );
                return Ok(None);
            }

            if !self
                .cancel
                .sleep(self.config.poll_interval().min(remaining))
                .await
            {
                self.fail_poll(job, ErrorKind::Cancelled, "batch cancelled while polling")
                    .await?;
                return Ok(None);
            }
        }
    }

    /// Download and write a finished video.
    async fn collect(
        &self,
        job: &mut GenerationJob,
        job_id: &str,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, IllegalTransitionError> {
        let payload = match self.client.fetch_result(job_id).await {
            Ok(payload) => payload,
            Err(e) => {
                self.fail_poll(job, ErrorKind::Fetch, e.to_string()).await?;
                return Ok(None);
            }
        };

        match self.writer.write(&job.audio_clip, &payload, output_dir).await {
            Ok(path) => {
                self.apply(job, JobEvent::PollDone).await?;
                info!("{}: saved {}", job.clip_name(), path.display());
                Ok(Some(path))
            }
            Err(e) => {
                self.fail_poll(job, ErrorKind::FileSystem, e.to_string())
                    .await?;
                Ok(None)
            }
        }
    }

    async fn fail_poll(
        &self,
        job: &mut GenerationJob,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Result<(), IllegalTransitionError> {
        self.apply(job, JobEvent::PollFail).await?;
        let info = job.record_error(kind, message);
        warn!("{}: {}", job.clip_name(), info);
        Ok(())
    }

    /// Advance the job and log the transition.
    async fn apply(
        &self,
        job: &mut GenerationJob,
        event: JobEvent,
    ) -> Result<JobState, IllegalTransitionError> {
        let from = job.state();
        let to = job.advance(event)?;

        if from == to {
            debug!("{}: {} ({})", job.clip_name(), to, event);
        } else {
            self.emit(BatchEvent::StateChanged {
                clip: job.clip_name(),
                job_id: job.id.clone(),
                from,
                to,
                attempt: job.attempts(),
            })
            .await;
        }

        Ok(to)
    }

    async fn emit_finished(&self, job: &GenerationJob, outcome: &ClipOutcome) {
        let (state, output_path, error) = match outcome {
            ClipOutcome::Succeeded(done) => {
                (JobState::Succeeded, Some(done.output_path.clone()), None)
            }
            ClipOutcome::Failed(failed) => {
                (failed.final_state, None, Some(failed.error.clone()))
            }
        };

        self.emit(BatchEvent::ClipFinished {
            clip: job.clip_name(),
            state,
            output_path,
            error,
            attempts: job.attempts(),
        })
        .await;
    }

    async fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            events.emit(event).await;
        }
    }
}
