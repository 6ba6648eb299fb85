//! File system writer implementation.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::{OutputConfig, OverwritePolicy};

use super::error::WriterError;
use super::traits::ResultWriter;

/// Writes videos to the local file system.
pub struct FsResultWriter {
    extension: String,
    overwrite: OverwritePolicy,
}

impl FsResultWriter {
    /// Creates a writer from the output configuration.
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            extension: config.video_extension.trim_start_matches('.').to_string(),
            overwrite: config.overwrite,
        }
    }

    /// Creates a writer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(&OutputConfig::default())
    }

    /// Temporary sibling used while the payload is being written.
    fn partial_path(destination: &Path) -> PathBuf {
        let mut name = destination
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".part");
        destination.with_file_name(name)
    }

    async fn write_partial(path: &Path, payload: &[u8]) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(payload).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultWriter for FsResultWriter {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn output_path(&self, audio_clip: &Path, output_dir: &Path) -> Result<PathBuf, WriterError> {
        let stem = audio_clip
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| WriterError::InvalidClipName {
                path: audio_clip.to_path_buf(),
            })?;

        let mut name = stem.to_os_string();
        name.push(".");
        name.push(&self.extension);
        Ok(output_dir.join(name))
    }

    async fn reusable_output(&self, audio_clip: &Path, output_dir: &Path) -> Option<PathBuf> {
        if self.overwrite == OverwritePolicy::Overwrite {
            return None;
        }

        let path = self.output_path(audio_clip, output_dir).ok()?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    async fn write(
        &self,
        audio_clip: &Path,
        payload: &[u8],
        output_dir: &Path,
    ) -> Result<PathBuf, WriterError> {
        let destination = self.output_path(audio_clip, output_dir)?;

        fs::create_dir_all(output_dir)
            .await
            .map_err(|e| WriterError::DirectoryCreationFailed {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        if self.overwrite == OverwritePolicy::Skip {
            let exists = fs::try_exists(&destination)
                .await
                .map_err(|e| WriterError::write_failed(destination.clone(), e))?;
            if exists {
                return Err(WriterError::DestinationExists { path: destination });
            }
        }

        let partial = Self::partial_path(&destination);
        if let Err(e) = Self::write_partial(&partial, payload).await {
            let _ = fs::remove_file(&partial).await;
            return Err(WriterError::write_failed(partial, e));
        }

        if let Err(e) = fs::rename(&partial, &destination).await {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                warn!("Failed to remove {}: {}", partial.display(), cleanup);
            }
            return Err(WriterError::write_failed(destination, e));
        }

        debug!("Wrote {} bytes to {}", payload.len(), destination.display());
        Ok(destination)
    }
}
