//! # Filesystem Artifact Store
//!
//! Writes images into a configured directory, creating it on first use.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ArtifactStore;
use crate::error::{PipelineError, Result};

/// Directory-backed artifact store
pub struct FilesystemArtifactStore {
    image_dir: PathBuf,
}

impl FilesystemArtifactStore {
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Create the image directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .map_err(|e| {
                PipelineError::configuration(
                    "sink",
                    format!("Failed to create {}: {e}", self.image_dir.display()),
                )
            })
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let path = self.image_dir.join(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PipelineError::sink_write(filename, e.to_string()))?;
        debug!(filename = %filename, bytes = bytes.len(), "Saved image");
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.image_dir).await.map_err(|e| {
            PipelineError::sink_write(self.image_dir.display().to_string(), e.to_string())
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            PipelineError::sink_write(self.image_dir.display().to_string(), e.to_string())
        })? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
