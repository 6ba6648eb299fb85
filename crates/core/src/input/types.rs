//! Types for input resolution.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that make a batch impossible to start.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Input folder not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Input path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No character image found in {dir}")]
    NoImage { dir: PathBuf },

    #[error(
        "Multiple character images found in {dir}; only one is allowed: {}",
        display_paths(.found)
    )]
    MultipleImages { dir: PathBuf, found: Vec<PathBuf> },

    #[error("No audio clips found in {dir}")]
    NoAudio { dir: PathBuf },

    #[error("Input file is empty: {path}")]
    EmptyFile { path: PathBuf },

    #[error(
        "Audio clips named '{stem}' would write the same video: {}",
        display_paths(.found)
    )]
    DuplicateClipStem { stem: String, found: Vec<PathBuf> },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One character image plus the audio clips to animate it with.
///
/// Only [`resolve`](super::resolve) builds this; it is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSet {
    character_image: PathBuf,
    audio_clips: Vec<PathBuf>,
}

impl InputSet {
    pub(super) fn new(character_image: PathBuf, audio_clips: Vec<PathBuf>) -> Self {
        Self {
            character_image,
            audio_clips,
        }
    }

    pub fn character_image(&self) -> &Path {
        &self.character_image
    }

    /// Audio clips in lexicographic file name order.
    pub fn audio_clips(&self) -> &[PathBuf] {
        &self.audio_clips
    }

    pub fn len(&self) -> usize {
        self.audio_clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audio_clips.is_empty()
    }
}
