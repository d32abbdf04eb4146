//! # Data Models
//!
//! Core data layer for the batch pipeline: claimable prompt batches and the
//! transient artifacts produced from them.

pub mod artifact;
pub mod prompt_batch;

// Re-export core models for easy access
pub use artifact::{ArtifactNamer, ProducedImage, TagMode};
pub use prompt_batch::{BatchRef, PromptBatchRow};
