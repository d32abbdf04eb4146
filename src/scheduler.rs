//! # Pipeline Scheduler
//!
//! Fixed-interval driver for the continuous pipeline variant. Each tick runs
//! one batch, publishes the outcome, and reschedules unconditionally: a
//! failed tick is logged and the next batch is attempted after the same
//! delay. The loop is an explicit component with a running flag and shutdown
//! notification, not a bare sleep loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::events::{names, OutcomePublisher};
use crate::indexer::ArtifactIndexer;
use crate::processor::{BatchOutcome, BatchProcessor};

/// Fixed-interval batch scheduler
pub struct PipelineScheduler {
    processor: Arc<BatchProcessor>,
    /// Catalog indexer run after productive ticks, when configured
    indexer: Option<Arc<ArtifactIndexer>>,
    publisher: OutcomePublisher,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    scheduler_id: Uuid,
}

impl PipelineScheduler {
    pub fn new(
        processor: Arc<BatchProcessor>,
        publisher: OutcomePublisher,
        interval: Duration,
    ) -> Self {
        Self {
            processor,
            indexer: None,
            publisher,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            scheduler_id: Uuid::new_v4(),
        }
    }

    /// Attach a catalog indexer to run after each tick that stored artifacts
    pub fn with_indexer(mut self, indexer: Arc<ArtifactIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the loop to stop after the current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.shutdown_notify.notify_waiters();
    }

    /// Run a single tick: one batch, outcome published, indexer driven if
    /// anything was stored. Used directly by the one-shot variant.
    #[instrument(skip(self), fields(scheduler_id = %self.scheduler_id))]
    pub async fn run_once(&self) -> BatchOutcome {
        let outcome = self.processor.process_all().await;

        match &outcome {
            BatchOutcome::NoPendingWork => {
                self.publisher
                    .publish(names::BATCH_NO_WORK, serde_json::json!({}));
            }
            BatchOutcome::Completed {
                units,
                attempted,
                produced,
                failed,
                claimed,
            } => {
                self.publisher.publish(
                    names::BATCH_COMPLETED,
                    serde_json::json!({
                        "units": units,
                        "attempted": attempted,
                        "produced": produced,
                        "failed": failed,
                        "claimed": claimed,
                    }),
                );

                if *produced > 0 {
                    self.run_indexer().await;
                }
            }
        }

        outcome
    }

    /// Run the continuous loop until `stop()` is called. The fixed
    /// inter-batch delay separates successive invocations; nothing that
    /// happens inside a tick terminates the loop.
    pub async fn run(&self) {
        self.running.store(true, Ordering::Release);
        info!(
            scheduler_id = %self.scheduler_id,
            interval_seconds = self.interval.as_secs(),
            "Pipeline scheduler started"
        );

        while self.is_running() {
            self.run_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.shutdown_notify.notified() => {}
            }
        }

        info!(scheduler_id = %self.scheduler_id, "Pipeline scheduler stopped");
    }

    async fn run_indexer(&self) {
        let Some(indexer) = &self.indexer else {
            return;
        };
        match indexer.run().await {
            Ok(report) => {
                self.publisher.publish(
                    names::INDEX_COMPLETED,
                    serde_json::json!({
                        "inserted": report.inserted,
                        "duplicates_skipped": report.duplicates_skipped,
                        "failed": report.failed,
                    }),
                );
            }
            Err(e) => {
                // Indexing failure never disturbs the batch loop
                error!(error = %e, "Artifact indexing failed");
                self.publisher.publish(
                    names::BATCH_FAILED,
                    serde_json::json!({ "stage": "index", "error": e.to_string() }),
                );
            }
        }
    }
}
