//! Testing utilities and mock implementations.
//!
//! Mocks for the remote service and the event sink, so the orchestrator can be
//! driven end to end against temp directories without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use hedra_batch_core::testing::{fixtures, MemoryEventSink, MockRemoteClient};
//!
//! let client = MockRemoteClient::new();
//! client.fail_submit("b.wav", RemoteError::submission(400, "bad audio")).await;
//!
//! fixtures::write_input_set(dir.path(), "char.png", &["a.wav", "b.wav"]);
//! ```

mod memory_event_sink;
mod mock_remote_client;

pub use memory_event_sink::MemoryEventSink;
pub use mock_remote_client::{MockRemoteClient, RecordedSubmit};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::orchestrator::OrchestratorConfig;

    /// Write a character image and audio clips with small non-empty contents.
    ///
    /// Returns the audio clip paths in the order given.
    pub fn write_input_set(dir: &Path, image: &str, audio_clips: &[&str]) -> Vec<PathBuf> {
        write_file(dir, image, b"\x89PNG fake image");
        audio_clips
            .iter()
            .map(|name| write_file(dir, name, format!("RIFF fake audio {}", name).as_bytes()))
            .collect()
    }

    /// Write one file, panicking on failure.
    pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Err(e) = std::fs::write(&path, contents) {
            panic!("failed to write fixture {}: {}", path.display(), e);
        }
        path
    }

    /// Millisecond-scale timing for tests.
    pub fn fast_config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_attempts: 3,
            backoff_base_ms: 5,
            backoff_cap_ms: 20,
            poll_interval_ms: 5,
            job_timeout_secs: 5,
        }
    }
}
