//! Batch lifecycle integration tests.
//!
//! These tests drive the orchestrator end to end against a mock remote
//! service and real temp directories:
//! resolve -> submit -> poll -> fetch -> write -> report

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use hedra_batch_core::{
    config::{InputConfig, OutputConfig},
    create_event_system,
    events::EventSink,
    testing::{fixtures, MemoryEventSink, MockRemoteClient},
    BatchOrchestrator, BatchReport, ErrorKind, FileEventSink, FsResultWriter, InputError,
    JobState, OrchestratorConfig, OverwritePolicy, PollResponse, RemoteError,
};
use hedra_batch_core::orchestrator::OrchestratorError;

/// Test helper holding the input and output folders and the mock service.
struct TestHarness {
    client: MockRemoteClient,
    input: TempDir,
    output: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            client: MockRemoteClient::new(),
            input: TempDir::new().expect("Failed to create input dir"),
            output: TempDir::new().expect("Failed to create output dir"),
        }
    }

    /// Harness with `char.png` and the given audio clips.
    fn with_clips(clips: &[&str]) -> Self {
        let harness = Self::new();
        fixtures::write_input_set(harness.input.path(), "char.png", clips);
        harness
    }

    fn orchestrator(&self) -> BatchOrchestrator {
        self.orchestrator_with(fixtures::fast_config(), OverwritePolicy::Skip, None)
    }

    fn orchestrator_with(
        &self,
        config: OrchestratorConfig,
        overwrite: OverwritePolicy,
        sink: Option<Arc<dyn EventSink>>,
    ) -> BatchOrchestrator {
        let writer = FsResultWriter::new(&OutputConfig {
            overwrite,
            ..Default::default()
        });
        let events = sink.map(|sink| {
            let (handle, writer) = create_event_system(sink, 64);
            tokio::spawn(writer.run());
            handle
        });

        BatchOrchestrator::new(
            config,
            Arc::new(self.client.clone()),
            Arc::new(writer),
            events,
        )
    }

    async fn run(
        &self,
        orchestrator: &BatchOrchestrator,
    ) -> Result<BatchReport, OrchestratorError> {
        self.run_into(orchestrator, self.output.path()).await
    }

    async fn run_into(
        &self,
        orchestrator: &BatchOrchestrator,
        output_dir: &Path,
    ) -> Result<BatchReport, OrchestratorError> {
        orchestrator
            .run_directory(
                self.input.path(),
                &InputConfig::default(),
                "A person talking",
                output_dir,
            )
            .await
    }

    fn output_file(&self, name: &str) -> PathBuf {
        self.output.path().join(name)
    }
}

fn clip_names(paths: impl IntoIterator<Item = impl AsRef<Path>>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.as_ref().file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn test_every_clip_gets_one_report_entry() {
    let harness = TestHarness::with_clips(&["a.wav", "b.mp3", "c.m4a"]);

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded.len() + report.failed.len(), 3);
    assert!(report.all_succeeded());
    assert_eq!(report.summary(), "3/3 succeeded");

    for (clip, video) in [("a.wav", "a.mp4"), ("b.mp3", "b.mp4"), ("c.m4a", "c.mp4")] {
        let bytes = std::fs::read(harness.output_file(video)).unwrap();
        assert_eq!(bytes, format!("mock-video:{clip}").into_bytes());
    }

    let first = &report.succeeded[0];
    assert_eq!(first.attempts, 1);
    assert!(!first.reused);
    assert_eq!(first.job_id.as_deref(), Some("job-1"));

    let submits = harness.client.submits().await;
    assert!(submits.iter().all(|s| s.prompt == "A person talking"));
    assert!(submits
        .iter()
        .all(|s| s.character_image == harness.input.path().join("char.png")));
}

#[tokio::test]
async fn test_missing_image_aborts_before_any_remote_call() {
    let harness = TestHarness::new();
    fixtures::write_file(harness.input.path(), "a.wav", b"audio");

    let err = harness.run(&harness.orchestrator()).await.unwrap_err();

    assert!(matches!(
        err,
        OrchestratorError::Input(InputError::NoImage { .. })
    ));
    assert_eq!(harness.client.total_calls().await, 0);
}

#[tokio::test]
async fn test_two_images_abort_before_any_remote_call() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    fixtures::write_file(harness.input.path(), "other.jpg", b"jpeg");

    let err = harness.run(&harness.orchestrator()).await.unwrap_err();

    match err {
        OrchestratorError::Input(InputError::MultipleImages { found, .. }) => {
            assert_eq!(clip_names(&found), vec!["char.png", "other.jpg"]);
        }
        other => panic!("Expected MultipleImages, got {other:?}"),
    }
    assert_eq!(harness.client.total_calls().await, 0);
}

#[tokio::test]
async fn test_rerun_with_skip_policy_keeps_outputs() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    let orchestrator = harness.orchestrator();

    let first = harness.run(&orchestrator).await.unwrap();
    assert!(first.all_succeeded());
    let before = std::fs::read(harness.output_file("a.mp4")).unwrap();
    let calls_after_first = harness.client.total_calls().await;

    harness.client.set_payload("a.wav", b"different".to_vec()).await;
    let second = harness.run(&orchestrator).await.unwrap();

    assert!(second.all_succeeded());
    assert!(second.succeeded.iter().all(|s| s.reused));
    assert_eq!(harness.client.total_calls().await, calls_after_first);
    assert_eq!(std::fs::read(harness.output_file("a.mp4")).unwrap(), before);
}

#[tokio::test]
async fn test_rerun_with_overwrite_policy_replaces_outputs() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    let orchestrator =
        harness.orchestrator_with(fixtures::fast_config(), OverwritePolicy::Overwrite, None);

    harness.run(&orchestrator).await.unwrap();
    harness.client.set_payload("a.wav", b"second".to_vec()).await;
    let report = harness.run(&orchestrator).await.unwrap();

    assert!(report.all_succeeded());
    assert!(!report.succeeded[0].reused);
    assert_eq!(harness.client.submit_count("a.wav").await, 2);
    assert_eq!(std::fs::read(harness.output_file("a.mp4")).unwrap(), b"second");
    assert!(!harness.output_file("a.mp4.part").exists());
}

#[tokio::test]
async fn test_always_transient_submit_stops_at_max_attempts() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .fail_submit("a.wav", RemoteError::Transient("HTTP 503".to_string()))
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(harness.client.submit_count("a.wav").await, 3);
    assert_eq!(report.failed.len(), 1);
    let failed = &report.failed[0];
    assert_eq!(failed.final_state, JobState::Failed);
    assert_eq!(failed.error.kind, ErrorKind::Transient);
    assert_eq!(failed.error.attempts, 3);
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn test_transient_submit_recovers_within_budget() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .fail_submit_times("a.wav", 2, RemoteError::Transient("timeout".to_string()))
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(report.succeeded[0].attempts, 3);
    assert!(harness.output_file("a.mp4").exists());
}

#[tokio::test]
async fn test_endless_running_times_out() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .set_polls("a.wav", vec![Ok(PollResponse::running().with_progress(0.3))])
        .await;
    let config = OrchestratorConfig {
        poll_interval_ms: 50,
        job_timeout_secs: 1,
        ..fixtures::fast_config()
    };
    let orchestrator = harness.orchestrator_with(config, OverwritePolicy::Skip, None);

    let report = harness.run(&orchestrator).await.unwrap();

    let failed = &report.failed[0];
    assert_eq!(failed.final_state, JobState::TimedOut);
    assert_eq!(failed.error.kind, ErrorKind::Timeout);
    // Timeouts are not retried.
    assert_eq!(harness.client.submit_count("a.wav").await, 1);
    assert!(harness.client.poll_count().await >= 2);
    assert!(!harness.output_file("a.mp4").exists());
}

#[tokio::test]
async fn test_rejected_clip_does_not_stop_the_batch() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    harness
        .client
        .fail_submit("b.wav", RemoteError::submission(400, "audio too short"))
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(clip_names(report.succeeded.iter().map(|s| &s.audio_clip)), vec!["a.wav"]);
    assert_eq!(report.succeeded[0].output_path, harness.output_file("a.mp4"));
    assert!(harness.output_file("a.mp4").exists());

    let failed = &report.failed[0];
    assert_eq!(clip_names([&failed.audio_clip]), vec!["b.wav"]);
    assert_eq!(failed.error.kind, ErrorKind::Submission);
    assert_eq!(harness.client.submit_count("b.wav").await, 1);
    assert!(!report.all_succeeded());
    assert_eq!(report.summary(), "1/2 succeeded");
}

#[tokio::test]
async fn test_clips_are_processed_in_name_order() {
    let harness = TestHarness::with_clips(&["b.wav", "a.wav"]);

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(
        clip_names(report.succeeded.iter().map(|s| &s.audio_clip)),
        vec!["a.wav", "b.wav"]
    );
    let submits = harness.client.submits().await;
    assert_eq!(
        clip_names(submits.iter().map(|s| &s.audio_clip)),
        vec!["a.wav", "b.wav"]
    );
    let rows: Vec<_> = report.outcome_rows().into_iter().map(|r| r.clip).collect();
    assert_eq!(rows, vec!["a.wav", "b.wav"]);
}

#[tokio::test]
async fn test_remote_generation_failure_is_resubmitted() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .set_polls("a.wav", vec![Ok(PollResponse::failed("content rejected"))])
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(harness.client.submit_count("a.wav").await, 3);
    let failed = &report.failed[0];
    assert_eq!(failed.error.kind, ErrorKind::GenerationFailed);
    assert_eq!(failed.error.message, "content rejected");
}

#[tokio::test]
async fn test_fetch_failure_is_not_retried() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .fail_fetch("a.wav", RemoteError::Fetch("empty video payload".to_string()))
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert_eq!(harness.client.submit_count("a.wav").await, 1);
    assert_eq!(report.failed[0].error.kind, ErrorKind::Fetch);
    assert_eq!(report.failed[0].job_id.as_deref(), Some("job-1"));
    assert!(!harness.output_file("a.mp4").exists());
}

#[tokio::test]
async fn test_transient_poll_errors_are_tolerated() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    harness
        .client
        .set_polls(
            "a.wav",
            vec![
                Err(RemoteError::Transient("HTTP 502".to_string())),
                Ok(PollResponse::running()),
                Ok(PollResponse::done()),
            ],
        )
        .await;

    let report = harness.run(&harness.orchestrator()).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(harness.client.poll_count().await, 3);
    assert_eq!(harness.client.submit_count("a.wav").await, 1);
}

#[tokio::test]
async fn test_cancel_before_start_attempts_nothing() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    let orchestrator = harness.orchestrator();
    orchestrator.cancel_handle().cancel();

    let report = harness.run(&orchestrator).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(clip_names(&report.not_attempted), vec!["a.wav", "b.wav"]);
    assert_eq!(harness.client.total_calls().await, 0);
    assert!(!report.all_succeeded());
}

#[tokio::test]
async fn test_cancel_while_polling_stops_the_batch() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    harness
        .client
        .set_polls("a.wav", vec![Ok(PollResponse::running())])
        .await;
    let config = OrchestratorConfig {
        poll_interval_ms: 20,
        job_timeout_secs: 30,
        ..fixtures::fast_config()
    };
    let orchestrator = harness.orchestrator_with(config, OverwritePolicy::Skip, None);

    let cancel = orchestrator.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(5), harness.run(&orchestrator))
        .await
        .expect("cancelled batch should finish promptly")
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].error.kind, ErrorKind::Cancelled);
    assert_eq!(clip_names(&report.not_attempted), vec!["b.wav"]);
    assert_eq!(harness.client.submit_count("b.wav").await, 0);
}

#[tokio::test]
async fn test_events_cover_every_transition() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    harness
        .client
        .fail_submit("b.wav", RemoteError::submission(422, "unsupported codec"))
        .await;
    let sink = MemoryEventSink::new();
    let orchestrator = harness.orchestrator_with(
        fixtures::fast_config(),
        OverwritePolicy::Skip,
        Some(Arc::new(sink.clone())),
    );

    harness.run(&orchestrator).await.unwrap();
    drop(orchestrator);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        sink.event_types(),
        vec![
            "batch_started",
            "state_changed",
            "state_changed",
            "state_changed",
            "clip_finished",
            "state_changed",
            "clip_finished",
            "batch_finished",
        ]
    );
    let lines = sink.lines();
    assert!(lines[1].contains(" - INFO - a.wav: pending -> submitted"));
    assert!(lines[5].contains(" - WARNING - b.wav: pending -> failed"));
    assert!(lines[6].contains(" - ERROR - b.wav: failed: submission_error"));
    assert!(lines
        .last()
        .unwrap()
        .ends_with(" - WARNING - Batch finished: 1/2 succeeded"));
}

#[tokio::test]
async fn test_run_log_file_is_written() {
    let harness = TestHarness::with_clips(&["a.wav"]);
    let log_path = harness.output_file("hedra_batch.log");
    let sink = FileEventSink::open(&log_path).unwrap();

    let (handle, writer) = create_event_system(Arc::new(sink), 64);
    let writer_task = tokio::spawn(writer.run());
    let orchestrator = BatchOrchestrator::new(
        fixtures::fast_config(),
        Arc::new(harness.client.clone()),
        Arc::new(FsResultWriter::with_defaults()),
        Some(handle),
    );

    let report = harness.run(&orchestrator).await.unwrap();
    drop(orchestrator);
    writer_task.await.unwrap();

    assert!(report.all_succeeded());
    let contents = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].contains(" - INFO - Batch "));
    assert!(lines[4].contains("a.wav: video saved to"));
    assert!(lines[5].ends_with(" - INFO - Batch finished: 1/1 succeeded"));
}

#[tokio::test]
async fn test_clips_sharing_a_stem_abort_before_any_remote_call() {
    let harness = TestHarness::with_clips(&["a.mp3", "a.wav", "b.wav"]);

    let err = harness.run(&harness.orchestrator()).await.unwrap_err();

    match err {
        OrchestratorError::Input(InputError::DuplicateClipStem { stem, found }) => {
            assert_eq!(stem, "a");
            assert_eq!(clip_names(&found), vec!["a.mp3", "a.wav"]);
        }
        other => panic!("Expected DuplicateClipStem, got {other:?}"),
    }
    assert_eq!(harness.client.total_calls().await, 0);
    assert!(!harness.output_file("a.mp4").exists());
}

#[tokio::test]
async fn test_write_failure_is_recorded_per_clip() {
    let harness = TestHarness::with_clips(&["a.wav", "b.wav"]);
    // A regular file where the output folder should be.
    let blocked = harness.output_file("blocked");
    std::fs::write(&blocked, b"not a directory").unwrap();

    let report = harness
        .run_into(&harness.orchestrator(), &blocked)
        .await
        .unwrap();

    assert_eq!(report.total, 2);
    assert!(report.succeeded.is_empty());
    assert_eq!(
        clip_names(report.failed.iter().map(|f| &f.audio_clip)),
        vec!["a.wav", "b.wav"]
    );
    for failed in &report.failed {
        assert_eq!(failed.final_state, JobState::Failed);
        assert_eq!(failed.error.kind, ErrorKind::FileSystem);
    }
    // Write errors are final; each clip was submitted once.
    assert_eq!(harness.client.submit_count("a.wav").await, 1);
    assert_eq!(harness.client.submit_count("b.wav").await, 1);
    assert!(!report.all_succeeded());
}
