//! Trait definitions for the writer module.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::WriterError;

/// Persists generated videos next to each other in an output folder.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    /// Returns the name of this writer implementation.
    fn name(&self) -> &str;

    /// Destination path of the video generated for `audio_clip`.
    fn output_path(&self, audio_clip: &Path, output_dir: &Path) -> Result<PathBuf, WriterError>;

    /// An existing output that should be kept instead of regenerating the clip.
    ///
    /// Returns `None` when the clip has to be generated.
    async fn reusable_output(&self, audio_clip: &Path, output_dir: &Path) -> Option<PathBuf>;

    /// Write `payload` as the video for `audio_clip`. Returns the final path.
    async fn write(
        &self,
        audio_clip: &Path,
        payload: &[u8],
        output_dir: &Path,
    ) -> Result<PathBuf, WriterError>;
}
