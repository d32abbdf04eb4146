//! # Batch Processor
//!
//! ## Architecture: Idempotent Claim Processing
//!
//! The processor is the orchestration core of the pipeline. A single run
//! walks discovery → fetch → parse → select → per-item produce/store →
//! claim, with isolated failure handling at every boundary:
//!
//! - Source and fetch failures are absorbed as "no work for this unit".
//! - A producer or store failure is caught and logged per item and never
//!   aborts the remaining items or the unit.
//! - A unit is claimed only after all of its items have been attempted;
//!   item failures do not block the claim (best-effort semantics).
//! - A failed claim is logged and leaves the unit eligible for the next
//!   cycle: at-least-once, never exactly-once.
//!
//! Items are processed strictly sequentially. There is no retry at any layer;
//! recovery is re-running the batch.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::error::PipelineError;
use crate::models::{ArtifactNamer, BatchRef};
use crate::parser::PromptParser;
use crate::producer::ImageProducer;
use crate::sink::ArtifactStore;
use crate::source::BatchSource;

/// How items are selected for production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Every valid item from each unit, in order, paired with its index
    #[default]
    Deterministic,
    /// `batch_size` uniform draws with replacement from the pooled valid
    /// items of all fetched units
    Random,
}

/// Whether fully-attempted units are marked claimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    /// Claim each unit after all of its items were attempted
    #[default]
    ClaimUnits,
    /// Never claim; the store is treated as an inexhaustible pool re-read
    /// every cycle (the continuous-loop configuration)
    LeaveUnclaimed,
}

/// Processor behavior knobs
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub selection: SelectionMode,
    /// Number of draws in random selection mode
    pub batch_size: usize,
    pub claim_mode: ClaimMode,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            selection: SelectionMode::Deterministic,
            batch_size: 5,
            claim_mode: ClaimMode::ClaimUnits,
        }
    }
}

/// Terminal outcome of one processor run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// Discovery returned nothing; producer and store were never invoked
    NoPendingWork,
    /// The batch ran to completion (possibly with per-item failures)
    Completed {
        /// Units whose payload was fetched
        units: usize,
        /// Production attempts made
        attempted: usize,
        /// Artifacts successfully stored
        produced: usize,
        /// Attempts that failed in production or storage
        failed: usize,
        /// Units successfully marked claimed
        claimed: usize,
    },
}

/// Orchestrates one batch run over injected source, producer, and store
pub struct BatchProcessor {
    source: Arc<dyn BatchSource>,
    producer: Arc<dyn ImageProducer>,
    store: Arc<dyn ArtifactStore>,
    parser: PromptParser,
    namer: ArtifactNamer,
    settings: ProcessorSettings,
    rng: Mutex<StdRng>,
}

impl BatchProcessor {
    pub fn new(
        source: Arc<dyn BatchSource>,
        producer: Arc<dyn ImageProducer>,
        store: Arc<dyn ArtifactStore>,
        parser: PromptParser,
        namer: ArtifactNamer,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            source,
            producer,
            store,
            parser,
            namer,
            settings,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the sampling RNG with a seeded one. Draw order in random
    /// selection mode becomes deterministic; used by tests.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Run one full batch. Never returns an error: every failure below the
    /// run scope is absorbed and logged with its unit/item context.
    #[instrument(skip(self), fields(source = self.source.backend_name()))]
    pub async fn process_all(&self) -> BatchOutcome {
        let units = self.source.list_pending().await;

        if units.is_empty() {
            info!("No pending prompt batches found");
            return BatchOutcome::NoPendingWork;
        }

        let outcome = match self.settings.selection {
            SelectionMode::Deterministic => self.process_deterministic(units).await,
            SelectionMode::Random => self.process_random_pool(units).await,
        };

        if let BatchOutcome::Completed {
            units,
            attempted,
            produced,
            failed,
            claimed,
        } = &outcome
        {
            info!(
                units = units,
                attempted = attempted,
                produced = produced,
                failed = failed,
                claimed = claimed,
                "Batch complete"
            );
        }
        outcome
    }

    /// Deterministic mode: every valid item of every unit, in order; each
    /// fully-attempted unit is claimed before the next unit starts.
    async fn process_deterministic(&self, units: Vec<BatchRef>) -> BatchOutcome {
        let mut fetched_units = 0usize;
        let mut attempted = 0usize;
        let mut produced = 0usize;
        let mut claimed = 0usize;

        for unit in &units {
            let Some(payload) = self.source.fetch_payload(unit).await else {
                // Fetch failed: the unit contributed nothing and stays
                // unclaimed, eligible for the next cycle
                continue;
            };
            fetched_units += 1;

            let items = self.parser.parse_prompts(&unit.id, &payload).into_items();
            info!(
                unit_id = %unit.id,
                item_count = items.len(),
                "Rendering prompts from batch"
            );

            for (index, prompt) in items.iter().enumerate() {
                attempted += 1;
                if self.attempt_item(unit, index, prompt).await {
                    produced += 1;
                }
            }

            if self.claim_unit(unit).await {
                claimed += 1;
            }
        }

        BatchOutcome::Completed {
            units: fetched_units,
            attempted,
            produced,
            failed: attempted - produced,
            claimed,
        }
    }

    /// Random mode: pool the valid items of every fetched unit, then make
    /// `batch_size` independent uniform draws with replacement. The same
    /// item may be drawn more than once in one run.
    async fn process_random_pool(&self, units: Vec<BatchRef>) -> BatchOutcome {
        let mut pool: Vec<(BatchRef, String)> = Vec::new();
        let mut fetched_units: Vec<BatchRef> = Vec::new();

        for unit in units {
            let Some(payload) = self.source.fetch_payload(&unit).await else {
                continue;
            };
            let items = self.parser.parse_prompts(&unit.id, &payload).into_items();
            for item in items {
                pool.push((unit.clone(), item));
            }
            fetched_units.push(unit);
        }

        if pool.is_empty() {
            warn!("Pending batches yielded an empty prompt pool");
            return BatchOutcome::Completed {
                units: fetched_units.len(),
                attempted: 0,
                produced: 0,
                failed: 0,
                claimed: 0,
            };
        }

        // Draw all indices up front so the lock never spans an await
        let draws: Vec<usize> = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            (0..self.settings.batch_size)
                .map(|_| rng.gen_range(0..pool.len()))
                .collect()
        };

        let mut attempted = 0usize;
        let mut produced = 0usize;
        for (draw_index, pool_index) in draws.into_iter().enumerate() {
            let (unit, prompt) = &pool[pool_index];
            attempted += 1;
            if self.attempt_item(unit, draw_index, prompt).await {
                produced += 1;
            }
        }

        let mut claimed = 0usize;
        if self.settings.claim_mode == ClaimMode::ClaimUnits {
            for unit in &fetched_units {
                if self.claim_unit(unit).await {
                    claimed += 1;
                }
            }
        }

        BatchOutcome::Completed {
            units: fetched_units.len(),
            attempted,
            produced,
            failed: attempted - produced,
            claimed,
        }
    }

    /// Attempt one item: produce, then store under the derived name.
    /// Returns whether an artifact was stored. Both failure paths are logged
    /// with the item's index and unit; neither aborts the caller's loop.
    async fn attempt_item(&self, unit: &BatchRef, index: usize, prompt: &str) -> bool {
        let image = match self.producer.produce(prompt, index).await {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    unit_id = %unit.id,
                    index = index,
                    error = %e,
                    "Image production failed, continuing with remaining items"
                );
                return false;
            }
        };

        let filename = self
            .namer
            .filename_for(&unit.id, index, chrono::Utc::now());

        match self.store.store(&filename, &image.bytes).await {
            Ok(()) => true,
            Err(e) => {
                // The artifact is lost for this attempt; it is not re-queued
                warn!(
                    unit_id = %unit.id,
                    index = index,
                    filename = %filename,
                    error = %e,
                    "Artifact store write failed, continuing with remaining items"
                );
                false
            }
        }
    }

    /// Request the claim transition for a fully-attempted unit. A failure is
    /// logged and absorbed: the unit stays eligible next cycle.
    async fn claim_unit(&self, unit: &BatchRef) -> bool {
        if self.settings.claim_mode == ClaimMode::LeaveUnclaimed {
            return false;
        }
        match self.source.mark_claimed(unit).await {
            Ok(()) => {
                info!(unit_id = %unit.id, "Flagged batch as complete");
                true
            }
            Err(e) => {
                let message = match &e {
                    PipelineError::Claim { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                error!(
                    unit_id = %unit.id,
                    error = %message,
                    "Claim mark failed; batch remains eligible for re-selection"
                );
                false
            }
        }
    }
}
