//! # Batch Sources
//!
//! A batch source enumerates pending prompt batches and owns their claimed
//! state. Two backends satisfy the same contract: a directory of prompt files
//! claimed via `.done` sentinels, and a Postgres table claimed via a
//! `processed` flag. Externally both behave identically: a claimed batch is
//! excluded from every later discovery call.
//!
//! Listing and fetch failures are absorbed here (logged, empty result); a
//! claim failure is returned to the caller but leaves the batch eligible for
//! re-selection on the next cycle, which is the accepted at-least-once
//! semantics.

pub mod database;
pub mod filesystem;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::BatchRef;

pub use database::DatabaseBatchSource;
pub use filesystem::FilesystemBatchSource;

/// Discovery policy for pending batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryPolicy {
    /// Every unclaimed batch, in the configured order
    #[default]
    AllPending,
    /// At most one batch: the oldest unclaimed one
    SingleOldest,
}

/// Iteration order for all-pending discovery.
///
/// The order is a determinism choice, not semantically load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryOrder {
    #[default]
    Ascending,
    Descending,
}

/// Contract for prompt batch backends
#[async_trait]
pub trait BatchSource: Send + Sync {
    /// Enumerate batches not yet claimed, under the source's configured
    /// discovery policy. A backing listing failure is absorbed: logged and
    /// rendered as an empty sequence.
    async fn list_pending(&self) -> Vec<BatchRef>;

    /// Fetch a batch's raw payload. A backing read failure is absorbed:
    /// logged and rendered as `None` (the batch contributes zero items).
    async fn fetch_payload(&self, unit: &BatchRef) -> Option<String>;

    /// Mark a batch claimed so it is excluded from future discovery.
    /// Idempotent: claiming an already-claimed batch succeeds. A failure is
    /// returned for the caller to log; the batch stays eligible for
    /// re-selection next cycle.
    async fn mark_claimed(&self, unit: &BatchRef) -> Result<()>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
