//! Input folder resolution.
//!
//! Scans one directory for exactly one character image and one or more audio
//! clips, and produces an immutable [`InputSet`]. Audio clips are ordered by
//! file name so that batch reports are reproducible.

mod resolver;
mod types;

pub use resolver::resolve;
pub use types::{InputError, InputSet};
