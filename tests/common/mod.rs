//! Shared test doubles for pipeline integration tests.
//!
//! The mocks record every interaction so tests can assert on call counts and
//! ordering, and support scripted failures per unit id, item index, or
//! filename.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use imageflow_core::error::{PipelineError, Result};
use imageflow_core::models::{BatchRef, ProducedImage};
use imageflow_core::producer::ImageProducer;
use imageflow_core::sink::ArtifactStore;
use imageflow_core::source::BatchSource;

/// In-memory batch source with scripted payloads and claim failures
#[derive(Default)]
pub struct MockBatchSource {
    /// unit id -> payload; `None` simulates a fetch failure
    units: Mutex<Vec<(String, Option<String>)>>,
    claimed: Mutex<HashSet<String>>,
    /// unit ids whose claim mutation fails
    failing_claims: Mutex<HashSet<String>>,
    listing_fails: AtomicBool,
    claim_calls: Mutex<Vec<String>>,
}

impl MockBatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unit(&self, id: &str, payload: &str) {
        self.units
            .lock()
            .unwrap()
            .push((id.to_string(), Some(payload.to_string())));
    }

    /// Add a unit whose payload fetch fails
    pub fn add_unfetchable_unit(&self, id: &str) {
        self.units.lock().unwrap().push((id.to_string(), None));
    }

    /// Make claim mutations fail for the given unit
    pub fn fail_claim_for(&self, id: &str) {
        self.failing_claims.lock().unwrap().insert(id.to_string());
    }

    pub fn allow_claim_for(&self, id: &str) {
        self.failing_claims.lock().unwrap().remove(id);
    }

    /// Make the listing call itself fail
    pub fn fail_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    pub fn claim_calls(&self) -> Vec<String> {
        self.claim_calls.lock().unwrap().clone()
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.claimed.lock().unwrap().contains(id)
    }
}

#[async_trait]
impl BatchSource for MockBatchSource {
    async fn list_pending(&self) -> Vec<BatchRef> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let claimed = self.claimed.lock().unwrap();
        self.units
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| !claimed.contains(id))
            .map(|(id, _)| BatchRef::new(id.clone()))
            .collect()
    }

    async fn fetch_payload(&self, unit: &BatchRef) -> Option<String> {
        self.units
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == unit.id)
            .and_then(|(_, payload)| payload.clone())
    }

    async fn mark_claimed(&self, unit: &BatchRef) -> Result<()> {
        self.claim_calls.lock().unwrap().push(unit.id.clone());
        if self.failing_claims.lock().unwrap().contains(&unit.id) {
            return Err(PipelineError::claim(&unit.id, "injected claim failure"));
        }
        self.claimed.lock().unwrap().insert(unit.id.clone());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Producer double returning the prompt bytes as the image, with scripted
/// per-index and per-prompt failures
#[derive(Default)]
pub struct MockProducer {
    failing_indices: Mutex<HashSet<usize>>,
    failing_prompts: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl MockProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_at_index(&self, index: usize) {
        self.failing_indices.lock().unwrap().insert(index);
    }

    pub fn fail_for_prompt(&self, prompt: &str) {
        self.failing_prompts.lock().unwrap().insert(prompt.to_string());
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ImageProducer for MockProducer {
    async fn produce(&self, prompt: &str, index: usize) -> Result<ProducedImage> {
        self.calls.lock().unwrap().push((prompt.to_string(), index));
        if self.failing_indices.lock().unwrap().contains(&index)
            || self.failing_prompts.lock().unwrap().contains(prompt)
        {
            return Err(PipelineError::producer(index, prompt, "injected failure"));
        }
        Ok(ProducedImage::new(prompt.as_bytes().to_vec()))
    }
}

/// Artifact store double recording stored names, with scripted write failures
#[derive(Default)]
pub struct RecordingStore {
    stored: Mutex<HashMap<String, Vec<u8>>>,
    order: Mutex<Vec<String>>,
    failing_names: Mutex<HashSet<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for_name(&self, name: &str) {
        self.failing_names.lock().unwrap().insert(name.to_string());
    }

    /// Stored names in write order
    pub fn stored_names(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn stored_count(&self) -> usize {
        self.order.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<()> {
        if self.failing_names.lock().unwrap().contains(filename) {
            return Err(PipelineError::sink_write(filename, "injected write failure"));
        }
        self.stored
            .lock()
            .unwrap()
            .insert(filename.to_string(), bytes.to_vec());
        self.order.lock().unwrap().push(filename.to_string());
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.stored.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}
