//! # Bucket Artifact Store
//!
//! Uploads images to an HTTP object-storage bucket. Uploads never overwrite:
//! the storage API answers 409 for an existing name, and that is surfaced as
//! a write failure rather than silently accepted. Name collisions are a
//! naming bug upstream, not something to mask here.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::ArtifactStore;
use crate::error::{PipelineError, Result};

/// Settings for the bucket storage client
#[derive(Debug, Clone)]
pub struct BucketStoreSettings {
    /// Storage API base endpoint, e.g. `https://storage.example.com/storage/v1`
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Bearer token for the storage API
    pub api_key: String,
}

/// HTTP object-storage artifact store with non-overwrite semantics
pub struct BucketArtifactStore {
    client: reqwest::Client,
    settings: BucketStoreSettings,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

impl BucketArtifactStore {
    pub fn new(client: reqwest::Client, settings: BucketStoreSettings) -> Self {
        Self { client, settings }
    }

    fn object_url(&self, filename: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.settings.endpoint, self.settings.bucket, filename
        )
    }

    fn list_url(&self) -> String {
        format!("{}/object/list/{}", self.settings.endpoint, self.settings.bucket)
    }
}

#[async_trait]
impl ArtifactStore for BucketArtifactStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        let response = self
            .client
            .post(self.object_url(filename))
            .bearer_auth(&self.settings.api_key)
            .header("x-upsert", "false")
            .header("content-type", "image/png")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| PipelineError::sink_write(filename, e.to_string()))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(PipelineError::sink_write(
                filename,
                "object already exists in bucket",
            ));
        }
        response
            .error_for_status()
            .map_err(|e| PipelineError::sink_write(filename, e.to_string()))?;

        debug!(
            filename = %filename,
            bucket = %self.settings.bucket,
            bytes = bytes.len(),
            "Uploaded image"
        );
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .post(self.list_url())
            .bearer_auth(&self.settings.api_key)
            .json(&serde_json::json!({ "prefix": "" }))
            .send()
            .await
            .map_err(|e| PipelineError::sink_write(self.settings.bucket.clone(), e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::sink_write(self.settings.bucket.clone(), e.to_string()))?;

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| PipelineError::sink_write(self.settings.bucket.clone(), e.to_string()))?;

        let mut names: Vec<String> = objects.into_iter().map(|o| o.name).collect();
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "bucket"
    }
}
