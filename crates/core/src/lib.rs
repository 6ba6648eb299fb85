pub mod config;
pub mod events;
pub mod input;
pub mod job;
pub mod orchestrator;
pub mod remote;
pub mod testing;
pub mod writer;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, OverwritePolicy, SanitizedConfig,
};
pub use events::{create_event_system, BatchEvent, EventHandle, EventSink, FileEventSink};
pub use input::{resolve, InputError, InputSet};
pub use job::{ErrorInfo, ErrorKind, GenerationJob, JobEvent, JobState};
pub use orchestrator::{BatchOrchestrator, BatchReport, CancelHandle, OrchestratorConfig};
pub use remote::{HedraClient, PollResponse, PollStatus, RemoteError, RemoteJobClient};
pub use writer::{FsResultWriter, ResultWriter, WriterError};
