//! Per-run event log.
//!
//! The orchestrator emits [`BatchEvent`]s through a cloneable [`EventHandle`];
//! an [`EventWriter`] task drains them into an [`EventSink`] until every
//! handle has been dropped.

mod handle;
mod sink;
mod types;
mod writer;

pub use handle::*;
pub use sink::*;
pub use types::*;
pub use writer::*;
