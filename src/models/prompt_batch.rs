//! # Prompt Batch Model
//!
//! A prompt batch is the claimable unit of work: one prompt file on disk or
//! one row in the `prompt_batches` table. The source backend owns the
//! authoritative claimed/unclaimed state; the processor only observes batch
//! references and requests claim transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Reference to a pending prompt batch as returned by source discovery.
///
/// The `id` is the claim handle understood by the backend that produced it
/// (filename for the filesystem source, row id for the database source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    /// Opaque identifier: filename or database row id rendered as text
    pub id: String,
    /// Ordering key for oldest-first selection, when the backend knows it
    pub created_at: Option<DateTime<Utc>>,
}

impl BatchRef {
    /// Create a batch reference without an ordering key (filesystem listing)
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
        }
    }

    /// Create a batch reference with its creation time (database listing)
    pub fn with_created_at(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at: Some(created_at),
        }
    }
}

/// Row shape of the `prompt_batches` table.
///
/// ```sql
/// CREATE TABLE prompt_batches (
///   batch_id BIGSERIAL PRIMARY KEY,
///   batch_key VARCHAR NOT NULL UNIQUE,
///   prompts JSONB NOT NULL,
///   processed BOOLEAN NOT NULL DEFAULT false,
///   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromptBatchRow {
    pub batch_id: i64,
    pub batch_key: String,
    pub prompts: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}
