//! Mock remote job client for testing.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::job::clip_name;
use crate::remote::{PollResponse, RemoteError, RemoteJobClient};

/// A recorded submit call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    pub character_image: PathBuf,
    pub audio_clip: PathBuf,
    pub prompt: String,
    /// Job id handed out, `None` if the call failed.
    pub job_id: Option<String>,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Scripted behavior for one audio clip, keyed by file name.
#[derive(Debug, Clone, Default)]
struct ClipScript {
    /// Fails every submit when set.
    submit_error: Option<RemoteError>,
    /// Fails the next submits, consumed one per call.
    submit_failures: VecDeque<RemoteError>,
    /// Poll responses per submission; the last one repeats.
    polls: Vec<Result<PollResponse, RemoteError>>,
    payload: Option<Vec<u8>>,
    fetch_error: Option<RemoteError>,
}

#[derive(Debug, Clone)]
struct MockJob {
    clip: String,
    polls: usize,
}

#[derive(Debug, Default)]
struct MockState {
    scripts: HashMap<String, ClipScript>,
    jobs: HashMap<String, MockJob>,
    submits: Vec<RecordedSubmit>,
    poll_calls: usize,
    fetch_calls: usize,
    job_counter: u32,
}

/// Mock implementation of the RemoteJobClient trait.
///
/// Unscripted clips succeed: submit returns a fresh job id, the first poll
/// reports done and the payload is `mock-video:<clip>`.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockRemoteClient::new();
/// client.fail_submit("b.wav", RemoteError::submission(400, "bad audio")).await;
/// client
///     .set_polls("a.wav", vec![Ok(PollResponse::running()), Ok(PollResponse::done())])
///     .await;
///
/// // ... run the orchestrator ...
///
/// assert_eq!(client.submit_count("b.wav").await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockRemoteClient {
    state: Arc<RwLock<MockState>>,
}

impl MockRemoteClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every submission of `clip` with `error`.
    pub async fn fail_submit(&self, clip: &str, error: RemoteError) {
        self.state
            .write()
            .await
            .scripts
            .entry(clip.to_string())
            .or_default()
            .submit_error = Some(error);
    }

    /// Fail the next `times` submissions of `clip`, then succeed.
    pub async fn fail_submit_times(&self, clip: &str, times: usize, error: RemoteError) {
        let mut state = self.state.write().await;
        let script = state.scripts.entry(clip.to_string()).or_default();
        script
            .submit_failures
            .extend(std::iter::repeat_n(error, times));
    }

    /// Poll responses for every job of `clip`. The last entry repeats.
    pub async fn set_polls(&self, clip: &str, polls: Vec<Result<PollResponse, RemoteError>>) {
        self.state
            .write()
            .await
            .scripts
            .entry(clip.to_string())
            .or_default()
            .polls = polls;
    }

    pub async fn set_payload(&self, clip: &str, payload: impl Into<Vec<u8>>) {
        self.state
            .write()
            .await
            .scripts
            .entry(clip.to_string())
            .or_default()
            .payload = Some(payload.into());
    }

    pub async fn fail_fetch(&self, clip: &str, error: RemoteError) {
        self.state
            .write()
            .await
            .scripts
            .entry(clip.to_string())
            .or_default()
            .fetch_error = Some(error);
    }

    /// All submit calls in order.
    pub async fn submits(&self) -> Vec<RecordedSubmit> {
        self.state.read().await.submits.clone()
    }

    /// Number of submit calls for `clip`.
    pub async fn submit_count(&self, clip: &str) -> usize {
        self.state
            .read()
            .await
            .submits
            .iter()
            .filter(|s| clip_name(&s.audio_clip) == clip)
            .count()
    }

    pub async fn poll_count(&self) -> usize {
        self.state.read().await.poll_calls
    }

    /// Submit, poll and fetch calls combined.
    pub async fn total_calls(&self) -> usize {
        let state = self.state.read().await;
        state.submits.len() + state.poll_calls + state.fetch_calls
    }

    async fn job_clip(&self, job_id: &str) -> Result<String, RemoteError> {
        self.state
            .read()
            .await
            .jobs
            .get(job_id)
            .map(|job| job.clip.clone())
            .ok_or_else(|| RemoteError::Protocol(format!("unknown job {}", job_id)))
    }
}

#[async_trait]
impl RemoteJobClient for MockRemoteClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        character_image: &Path,
        audio_clip: &Path,
        prompt: &str,
    ) -> Result<String, RemoteError> {
        let clip = clip_name(audio_clip);
        let mut state = self.state.write().await;

        let script = state.scripts.entry(clip.clone()).or_default();
        let failure = script
            .submit_failures
            .pop_front()
            .or_else(|| script.submit_error.clone());

        let result = match failure {
            Some(error) => Err(error),
            None => {
                state.job_counter += 1;
                let job_id = format!("job-{}", state.job_counter);
                state.jobs.insert(
                    job_id.clone(),
                    MockJob {
                        clip: clip.clone(),
                        polls: 0,
                    },
                );
                Ok(job_id)
            }
        };

        state.submits.push(RecordedSubmit {
            character_image: character_image.to_path_buf(),
            audio_clip: audio_clip.to_path_buf(),
            prompt: prompt.to_string(),
            job_id: result.as_ref().ok().cloned(),
            timestamp: Utc::now(),
        });

        result
    }

    async fn poll(&self, job_id: &str) -> Result<PollResponse, RemoteError> {
        let mut state = self.state.write().await;
        state.poll_calls += 1;

        let Some(job) = state.jobs.get_mut(job_id) else {
            return Err(RemoteError::Protocol(format!("unknown job {}", job_id)));
        };
        let idx = job.polls;
        job.polls += 1;
        let clip = job.clip.clone();

        let polls = state
            .scripts
            .get(&clip)
            .map(|s| s.polls.as_slice())
            .unwrap_or_default();
        match polls.get(idx).or_else(|| polls.last()) {
            Some(response) => response.clone(),
            None => Ok(PollResponse::done()),
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<Vec<u8>, RemoteError> {
        let clip = self.job_clip(job_id).await?;
        let mut state = self.state.write().await;
        state.fetch_calls += 1;

        let script = state.scripts.get(&clip).cloned().unwrap_or_default();
        if let Some(error) = script.fetch_error {
            return Err(error);
        }
        Ok(script
            .payload
            .unwrap_or_else(|| format!("mock-video:{}", clip).into_bytes()))
    }
}
