//! Writing generated videos into the output folder.
//!
//! Output files are named after the audio clip (`a.wav` -> `a.mp4`). Payloads
//! are written to a `.part` sibling first and renamed into place, so a reader
//! never observes a partially written video under the final name.

mod error;
mod fs_writer;
mod traits;

pub use error::WriterError;
pub use fs_writer::FsResultWriter;
pub use traits::ResultWriter;
