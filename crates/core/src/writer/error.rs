//! Error types for the writer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing an output video.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Output already exists and the overwrite policy keeps it.
    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Failed to create the output directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or rename the output file.
    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The audio clip path has no usable file stem.
    #[error("Cannot derive an output name from {path}")]
    InvalidClipName { path: PathBuf },
}

impl WriterError {
    /// Classify an I/O error on `path`.
    pub fn write_failed(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path }
        } else {
            Self::WriteFailed { path, source }
        }
    }
}
