//! # Image Producer
//!
//! The producer turns a prompt string into an image buffer. It is treated as
//! an opaque external collaborator: a call may fail for any reason (quota,
//! content policy, network) and the orchestration loop always catches the
//! failure per item.
//!
//! `HttpImageProducer` speaks the generation API's two-step protocol: a POST
//! requesting one image for the prompt, which returns a URL, followed by a
//! download of that URL into bytes.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::ProducedImage;

/// Contract for image generation backends
#[async_trait]
pub trait ImageProducer: Send + Sync {
    /// Produce an image for the prompt at the given item index. The index is
    /// only used for error context; production itself depends on the prompt
    /// alone.
    async fn produce(&self, prompt: &str, index: usize) -> Result<ProducedImage>;
}

/// Settings for the HTTP generation client
#[derive(Debug, Clone)]
pub struct HttpProducerSettings {
    /// API base endpoint, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    /// Model identifier sent with each request
    pub model: String,
    /// Requested image dimensions, e.g. `1024x1024`
    pub image_size: String,
    /// Bearer token for the generation API
    pub api_key: String,
}

/// HTTP-backed image producer.
///
/// The reqwest client is constructed once at startup and injected; it is
/// stateless and needs no teardown.
pub struct HttpImageProducer {
    client: reqwest::Client,
    settings: HttpProducerSettings,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

impl HttpImageProducer {
    pub fn new(client: reqwest::Client, settings: HttpProducerSettings) -> Self {
        Self { client, settings }
    }

    async fn request_generation(&self, prompt: &str, index: usize) -> Result<String> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": prompt,
            "n": 1,
            "size": self.settings.image_size,
        });

        let response = self
            .client
            .post(format!("{}/images/generations", self.settings.endpoint))
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?;

        let generation: GenerationResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?;

        let first = generation.data.into_iter().next().ok_or_else(|| {
            PipelineError::producer(index, prompt, "no image data returned")
        })?;

        first
            .url
            .ok_or_else(|| PipelineError::producer(index, prompt, "image URL missing"))
    }

    async fn download(&self, url: &str, prompt: &str, index: usize) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?
            .error_for_status()
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::producer(index, prompt, e.to_string()))?;

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageProducer for HttpImageProducer {
    async fn produce(&self, prompt: &str, index: usize) -> Result<ProducedImage> {
        let url = self.request_generation(prompt, index).await?;
        debug!(index = index, "Generation returned image URL, downloading");
        let bytes = self.download(&url, prompt, index).await?;
        Ok(ProducedImage::new(bytes))
    }
}
