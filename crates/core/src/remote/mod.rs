//! Remote generation job client abstraction.
//!
//! This module provides a `RemoteJobClient` trait for the asynchronous
//! submit / poll / fetch protocol of a video generation service, and the
//! HTTP implementation for the Hedra API.

mod hedra;
mod types;

pub use hedra::HedraClient;
pub use types::*;
