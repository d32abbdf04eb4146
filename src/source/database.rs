//! # Database Batch Source
//!
//! Prompt batches are rows in the `prompt_batches` table; a batch is claimed
//! by setting its `processed` flag. Pending discovery orders by `created_at`
//! so the single-oldest policy picks up the longest-waiting batch first.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::{BatchSource, DiscoveryOrder, DiscoveryPolicy};
use crate::error::{PipelineError, Result};
use crate::models::{BatchRef, PromptBatchRow};

/// Postgres-backed batch source with `processed`-flag claiming
pub struct DatabaseBatchSource {
    pool: PgPool,
    discovery: DiscoveryPolicy,
    order: DiscoveryOrder,
}

impl DatabaseBatchSource {
    pub fn new(pool: PgPool, discovery: DiscoveryPolicy, order: DiscoveryOrder) -> Self {
        Self {
            pool,
            discovery,
            order,
        }
    }
}

#[async_trait]
impl BatchSource for DatabaseBatchSource {
    async fn list_pending(&self) -> Vec<BatchRef> {
        let query = match (self.discovery, self.order) {
            (DiscoveryPolicy::SingleOldest, _) => {
                "SELECT batch_id, batch_key, prompts, processed, created_at \
                 FROM prompt_batches WHERE processed = false \
                 ORDER BY created_at ASC LIMIT 1"
            }
            (DiscoveryPolicy::AllPending, DiscoveryOrder::Ascending) => {
                "SELECT batch_id, batch_key, prompts, processed, created_at \
                 FROM prompt_batches WHERE processed = false \
                 ORDER BY created_at ASC"
            }
            (DiscoveryPolicy::AllPending, DiscoveryOrder::Descending) => {
                "SELECT batch_id, batch_key, prompts, processed, created_at \
                 FROM prompt_batches WHERE processed = false \
                 ORDER BY created_at DESC"
            }
        };

        let rows = match sqlx::query_as::<_, PromptBatchRow>(query)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    error = %e,
                    "Pending batch listing failed, yielding empty work set"
                );
                return Vec::new();
            }
        };

        let pending: Vec<BatchRef> = rows
            .into_iter()
            .map(|row| BatchRef::with_created_at(row.batch_key, row.created_at))
            .collect();

        debug!(pending = pending.len(), "Discovered pending batch rows");
        pending
    }

    async fn fetch_payload(&self, unit: &BatchRef) -> Option<String> {
        let result: std::result::Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT prompts::TEXT FROM prompt_batches WHERE batch_key = $1")
                .bind(&unit.id)
                .fetch_optional(&self.pool)
                .await;

        match result {
            Ok(Some((payload,))) => Some(payload),
            Ok(None) => {
                warn!(
                    unit_id = %unit.id,
                    "Batch row vanished between discovery and fetch, contributing zero items"
                );
                None
            }
            Err(e) => {
                warn!(
                    unit_id = %unit.id,
                    error = %e,
                    "Batch payload fetch failed, contributing zero items"
                );
                None
            }
        }
    }

    async fn mark_claimed(&self, unit: &BatchRef) -> Result<()> {
        sqlx::query("UPDATE prompt_batches SET processed = true WHERE batch_key = $1")
            .bind(&unit.id)
            .execute(&self.pool)
            .await
            .map_err(|e| PipelineError::claim(&unit.id, e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "database"
    }
}
