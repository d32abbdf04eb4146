//! # Imageflow Configuration System
//!
//! YAML-based configuration with environment-specific overlays. All tunable
//! behavior of the pipeline lives here: source/sink backends, selection
//! policies, producer endpoint, scheduler cadence, and the artifact indexer.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use imageflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let interval = manager.config().scheduler.interval_seconds;
//! let min_chars = manager.config().processor.min_prompt_chars;
//! # Ok(())
//! # }
//! ```
//!
//! Secrets are never stored in YAML: the producer and bucket sections name
//! the environment variable that carries their API key.

pub mod loader;

use serde::{Deserialize, Serialize};

pub use loader::ConfigManager;

use crate::error::PipelineError;
use crate::models::artifact::TagMode;
use crate::processor::{ClaimMode, SelectionMode};
use crate::source::{DiscoveryOrder, DiscoveryPolicy};

/// Root configuration structure mirroring imageflow.yaml
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ImageflowConfig {
    /// Database connection settings (required for the database source and
    /// the artifact indexer)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Prompt batch source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Image producer (generation API) configuration
    #[serde(default)]
    pub producer: ProducerConfig,

    /// Artifact sink configuration
    #[serde(default)]
    pub sink: SinkConfig,

    /// Batch processor behavior
    #[serde(default)]
    pub processor: ProcessorConfig,

    /// Continuous polling scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Artifact catalog indexer settings
    #[serde(default)]
    pub indexer: IndexerConfig,
}

impl ImageflowConfig {
    /// Validate cross-section requirements. Called once at load time; a
    /// failure here is the single fatal startup path.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.source.backend == SourceBackend::Database && self.database.url.is_none() {
            return Err(PipelineError::configuration(
                "database",
                "source.backend = database requires database.url",
            ));
        }
        if self.indexer.enabled && self.database.url.is_none() {
            return Err(PipelineError::configuration(
                "database",
                "indexer.enabled = true requires database.url",
            ));
        }
        if self.sink.backend == SinkBackend::Bucket && self.sink.bucket.is_none() {
            return Err(PipelineError::configuration(
                "sink",
                "sink.backend = bucket requires a sink.bucket section",
            ));
        }
        if self.processor.selection == SelectionMode::Random && self.processor.batch_size == 0 {
            return Err(PipelineError::configuration(
                "processor",
                "selection = random requires batch_size > 0",
            ));
        }
        if self.scheduler.interval_seconds == 0 {
            return Err(PipelineError::configuration(
                "scheduler",
                "interval_seconds must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL; falls back to DATABASE_URL at load time
    pub url: Option<String>,
    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool: u32,
}

fn default_pool_size() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool: default_pool_size(),
        }
    }
}

/// Which backend serves prompt batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceBackend {
    #[default]
    Filesystem,
    Database,
}

/// Prompt batch source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub backend: SourceBackend,
    /// Directory holding prompt batch files (filesystem backend)
    #[serde(default = "default_prompt_dir")]
    pub prompt_dir: String,
    /// Discovery policy: every pending unit, or only the single oldest
    #[serde(default)]
    pub discovery: DiscoveryPolicy,
    /// Iteration order for all-pending discovery
    #[serde(default)]
    pub order: DiscoveryOrder,
}

fn default_prompt_dir() -> String {
    "data/generated".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            backend: SourceBackend::default(),
            prompt_dir: default_prompt_dir(),
            discovery: DiscoveryPolicy::default(),
            order: DiscoveryOrder::default(),
        }
    }
}

/// Image producer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProducerConfig {
    /// Generation API base endpoint
    #[serde(default = "default_producer_endpoint")]
    pub endpoint: String,
    /// Model identifier sent with each generation request
    #[serde(default = "default_producer_model")]
    pub model: String,
    /// Requested image dimensions
    #[serde(default = "default_image_size")]
    pub image_size: String,
    /// Environment variable holding the API key
    #[serde(default = "default_producer_key_env")]
    pub api_key_env: String,
}

fn default_producer_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_producer_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_producer_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_producer_endpoint(),
            model: default_producer_model(),
            image_size: default_image_size(),
            api_key_env: default_producer_key_env(),
        }
    }
}

/// Which backend stores produced artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SinkBackend {
    #[default]
    Filesystem,
    Bucket,
}

/// Artifact sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub backend: SinkBackend,
    /// Directory receiving images (filesystem backend)
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    /// Remote bucket settings (bucket backend)
    pub bucket: Option<BucketConfig>,
}

fn default_image_dir() -> String {
    "data/images".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            backend: SinkBackend::default(),
            image_dir: default_image_dir(),
            bucket: None,
        }
    }
}

/// Remote object-storage bucket settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BucketConfig {
    /// Storage API base endpoint
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Environment variable holding the storage API key
    #[serde(default = "default_bucket_key_env")]
    pub api_key_env: String,
}

fn default_bucket_key_env() -> String {
    "STORAGE_API_KEY".to_string()
}

/// Batch processor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorConfig {
    /// Minimum trimmed prompt length accepted into the selectable pool
    #[serde(default = "default_min_prompt_chars")]
    pub min_prompt_chars: usize,
    /// Item selection mode
    #[serde(default)]
    pub selection: SelectionMode,
    /// Number of random draws in random selection mode
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Whether fully-attempted units are marked claimed
    #[serde(default)]
    pub claim_mode: ClaimMode,
    /// Artifact filename tag derivation
    #[serde(default = "default_tag_mode")]
    pub tag_mode: TagMode,
}

fn default_min_prompt_chars() -> usize {
    crate::parser::DEFAULT_MIN_PROMPT_CHARS
}

fn default_batch_size() -> usize {
    5
}

fn default_tag_mode() -> TagMode {
    TagMode::BatchTag
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            min_prompt_chars: default_min_prompt_chars(),
            selection: SelectionMode::default(),
            batch_size: default_batch_size(),
            claim_mode: ClaimMode::default(),
            tag_mode: default_tag_mode(),
        }
    }
}

/// Continuous polling scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Fixed delay between successive batch invocations
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_interval_seconds() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
        }
    }
}

/// Artifact catalog indexer configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IndexerConfig {
    /// Whether the indexing job runs after batches complete
    #[serde(default)]
    pub enabled: bool,
}
