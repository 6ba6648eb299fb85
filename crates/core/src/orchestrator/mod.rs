//! Batch orchestrator.
//!
//! Processes the clips of an input set sequentially:
//! - **Submit**: retried with exponential backoff while the error is transient
//! - **Poll**: fixed interval, bounded by a per-job wall-clock budget
//! - **Collect**: download the video and hand it to the result writer
//!
//! A failing clip never stops the batch; only an unusable input folder does.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::BatchOrchestrator;
pub use types::{
    BatchReport, CancelHandle, FailedClip, OrchestratorError, OutcomeRow, SucceededClip,
};
