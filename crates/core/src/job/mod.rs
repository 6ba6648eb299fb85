//! Per-clip generation jobs and their lifecycle.
//!
//! A [`GenerationJob`] tracks one audio clip through the remote generation
//! lifecycle. [`GenerationJob::advance`] is the only way to change its state
//! and rejects anything the transition table does not allow.

mod state_machine;
mod types;

pub use state_machine::IllegalTransitionError;
pub(crate) use types::clip_name;
pub use types::{ErrorInfo, ErrorKind, GenerationJob, JobEvent, JobState, Transition};
