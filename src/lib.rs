#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Imageflow Core
//!
//! Batch pipeline core for prompt-driven image generation with idempotent
//! claim processing.
//!
//! ## Overview
//!
//! The pipeline reads prompt batches from a source (a directory of JSON
//! files or a Postgres table), renders each prompt through an external image
//! generation API, and persists the resulting images to an artifact store
//! (local directory or HTTP object-storage bucket), marking batches claimed
//! so they are never re-discovered.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌────────────────┐    ┌──────────────┐    ┌───────────────┐
//! │ BatchSource │───▶│ BatchProcessor │───▶│ ImageProducer│───▶│ ArtifactStore │
//! │ (fs / db)   │◀───│ (claim loop)   │    │ (HTTP API)   │    │ (fs / bucket) │
//! └─────────────┘    └────────────────┘    └──────────────┘    └───────────────┘
//!        claim              │ outcome events
//!                    ┌──────▼──────────┐
//!                    │ PipelineScheduler│  fixed-interval continuous loop
//!                    └─────────────────┘
//! ```
//!
//! The defining behavioral contract is per-item isolation: one prompt's
//! failure is caught, logged with its index and batch, and never aborts the
//! remaining prompts or the batch. Claiming is best-effort and at-least-once;
//! a failed claim leaves the batch eligible for the next cycle.
//!
//! ## Module Organization
//!
//! - [`models`] - Prompt batches and artifact naming
//! - [`source`] - Claimable batch backends (filesystem, database)
//! - [`parser`] - Payload parsing and prompt validation
//! - [`processor`] - The claim-and-process orchestration core
//! - [`producer`] - Image generation client
//! - [`sink`] - Artifact persistence backends
//! - [`scheduler`] - Continuous fixed-interval driver
//! - [`indexer`] - Artifact catalog job
//! - [`config`] - YAML configuration with environment overlays
//! - [`error`] - Structured error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imageflow_core::config::ConfigManager;
//! use imageflow_core::parser::PromptParser;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let parser = PromptParser::new(manager.config().processor.min_prompt_chars);
//!
//! let prompts = parser
//!     .parse_prompts("unit", r#"{"prompts":["a red fox in snow"]}"#)
//!     .into_items();
//! assert_eq!(prompts.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod parser;
pub mod processor;
pub mod producer;
pub mod scheduler;
pub mod sink;
pub mod source;

pub use config::{ConfigManager, ImageflowConfig};
pub use error::{PipelineError, Result};
pub use events::{OutcomeEvent, OutcomePublisher};
pub use indexer::{ArtifactIndexer, IndexReport};
pub use logging::init_structured_logging;
pub use models::{ArtifactNamer, BatchRef, ProducedImage, TagMode};
pub use parser::{ParsedPrompts, PromptParser};
pub use processor::{BatchOutcome, BatchProcessor, ClaimMode, ProcessorSettings, SelectionMode};
pub use producer::{HttpImageProducer, HttpProducerSettings, ImageProducer};
pub use scheduler::PipelineScheduler;
pub use sink::{ArtifactStore, BucketArtifactStore, BucketStoreSettings, FilesystemArtifactStore};
pub use source::{
    BatchSource, DatabaseBatchSource, DiscoveryOrder, DiscoveryPolicy, FilesystemBatchSource,
};
