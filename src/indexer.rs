//! # Artifact Indexer
//!
//! Decoupled catalog job: scans the artifact store and records each `.png`
//! name into the `image_catalog` table. A name that is already cataloged
//! raises a unique violation, which is a non-fatal skip logged distinctly
//! from real insert failures.
//!
//! ```sql
//! CREATE TABLE image_catalog (
//!   image_name VARCHAR PRIMARY KEY,
//!   indexed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::sink::ArtifactStore;

/// Counts from one indexing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub scanned: usize,
    pub inserted: usize,
    pub duplicates_skipped: usize,
    pub failed: usize,
}

/// Outcome of recording a single artifact name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    DuplicateSkipped,
}

/// Catalogs stored artifacts into the image catalog table
pub struct ArtifactIndexer {
    pool: PgPool,
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactIndexer {
    pub fn new(pool: PgPool, store: Arc<dyn ArtifactStore>) -> Self {
        Self { pool, store }
    }

    /// Scan the store and catalog every `.png` name. Per-name insert
    /// failures are counted and logged but never abort the scan; only a
    /// failed store listing errors out (there is nothing to index).
    #[instrument(skip(self), fields(store = self.store.backend_name()))]
    pub async fn run(&self) -> Result<IndexReport> {
        let names = self.store.list_names().await?;

        let mut report = IndexReport::default();
        for name in names.iter().filter(|n| n.ends_with(".png")) {
            report.scanned += 1;
            match self.record(name).await {
                Ok(RecordOutcome::Inserted) => report.inserted += 1,
                Ok(RecordOutcome::DuplicateSkipped) => report.duplicates_skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(image_name = %name, error = %e, "Catalog insert failed");
                }
            }
        }

        info!(
            scanned = report.scanned,
            inserted = report.inserted,
            duplicates_skipped = report.duplicates_skipped,
            failed = report.failed,
            "Artifact indexing complete"
        );
        Ok(report)
    }

    /// Record one artifact name. The duplicate branch is detected from the
    /// database's unique violation so the skip can be observed and logged
    /// distinctly, rather than absorbed by `ON CONFLICT DO NOTHING`.
    pub async fn record(&self, image_name: &str) -> Result<RecordOutcome> {
        let result = sqlx::query("INSERT INTO image_catalog (image_name) VALUES ($1)")
            .bind(image_name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(RecordOutcome::Inserted),
            Err(e) => {
                let is_duplicate = matches!(
                    &e,
                    sqlx::Error::Database(db_err) if db_err.is_unique_violation()
                );
                if is_duplicate {
                    debug!(image_name = %image_name, "Already cataloged, skipping");
                    Ok(RecordOutcome::DuplicateSkipped)
                } else {
                    Err(e.into())
                }
            }
        }
    }
}
