//! # Filesystem Batch Source
//!
//! Prompt batches are JSON files named `generated-prompts-*.json` in a
//! configured directory. A batch is claimed by writing an empty `<file>.done`
//! sentinel next to it; files with a sentinel are excluded from discovery.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{BatchSource, DiscoveryOrder, DiscoveryPolicy};
use crate::error::{PipelineError, Result};
use crate::models::artifact::{BATCH_KEY_PREFIX, BATCH_KEY_SUFFIX};
use crate::models::BatchRef;

/// Suffix of the claim sentinel file
const DONE_SUFFIX: &str = ".done";

/// Directory-backed batch source with `.done` sentinel claiming
pub struct FilesystemBatchSource {
    prompt_dir: PathBuf,
    discovery: DiscoveryPolicy,
    order: DiscoveryOrder,
}

impl FilesystemBatchSource {
    pub fn new(
        prompt_dir: impl Into<PathBuf>,
        discovery: DiscoveryPolicy,
        order: DiscoveryOrder,
    ) -> Self {
        Self {
            prompt_dir: prompt_dir.into(),
            discovery,
            order,
        }
    }

    pub fn prompt_dir(&self) -> &Path {
        &self.prompt_dir
    }

    fn is_batch_file(name: &str) -> bool {
        name.starts_with(BATCH_KEY_PREFIX) && name.ends_with(BATCH_KEY_SUFFIX)
    }

    fn sentinel_path(&self, unit_id: &str) -> PathBuf {
        self.prompt_dir.join(format!("{unit_id}{DONE_SUFFIX}"))
    }
}

#[async_trait]
impl BatchSource for FilesystemBatchSource {
    async fn list_pending(&self) -> Vec<BatchRef> {
        let mut entries = match tokio::fs::read_dir(&self.prompt_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %self.prompt_dir.display(),
                    error = %e,
                    "Prompt directory listing failed, yielding empty work set"
                );
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if Self::is_batch_file(&name) {
                        names.push(name);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(
                        dir = %self.prompt_dir.display(),
                        error = %e,
                        "Prompt directory listing failed mid-iteration, yielding empty work set"
                    );
                    return Vec::new();
                }
            }
        }

        // File names embed the batch date, so name order is creation order
        names.sort();
        if self.order == DiscoveryOrder::Descending {
            names.reverse();
        }

        let mut pending = Vec::new();
        for name in names {
            let claimed = tokio::fs::try_exists(self.sentinel_path(&name))
                .await
                .unwrap_or(false);
            if !claimed {
                pending.push(BatchRef::new(name));
                if self.discovery == DiscoveryPolicy::SingleOldest {
                    break;
                }
            }
        }

        debug!(
            dir = %self.prompt_dir.display(),
            pending = pending.len(),
            "Discovered pending prompt files"
        );
        pending
    }

    async fn fetch_payload(&self, unit: &BatchRef) -> Option<String> {
        match tokio::fs::read_to_string(self.prompt_dir.join(&unit.id)).await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(
                    unit_id = %unit.id,
                    error = %e,
                    "Prompt file read failed, batch contributes zero items"
                );
                None
            }
        }
    }

    async fn mark_claimed(&self, unit: &BatchRef) -> Result<()> {
        tokio::fs::write(self.sentinel_path(&unit.id), "")
            .await
            .map_err(|e| PipelineError::claim(&unit.id, e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
