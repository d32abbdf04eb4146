//! Integration tests for the claim-and-process orchestration core.

mod common;

use std::sync::Arc;

use common::{MockBatchSource, MockProducer, RecordingStore};
use imageflow_core::models::{ArtifactNamer, TagMode};
use imageflow_core::parser::PromptParser;
use imageflow_core::processor::{
    BatchOutcome, BatchProcessor, ClaimMode, ProcessorSettings, SelectionMode,
};

fn processor(
    source: Arc<MockBatchSource>,
    producer: Arc<MockProducer>,
    store: Arc<RecordingStore>,
    settings: ProcessorSettings,
    tag_mode: TagMode,
) -> BatchProcessor {
    BatchProcessor::new(
        source,
        producer,
        store,
        PromptParser::default(),
        ArtifactNamer::standard(tag_mode),
        settings,
    )
}

#[tokio::test]
async fn no_pending_work_never_touches_producer_or_store() {
    let source = Arc::new(MockBatchSource::new());
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    assert_eq!(proc.process_all().await, BatchOutcome::NoPendingWork);
    assert_eq!(producer.call_count(), 0);
    assert_eq!(store.stored_count(), 0);
}

#[tokio::test]
async fn listing_failure_is_absorbed_as_no_work() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20240101.json", r#"{"prompts":["a red fox"]}"#);
    source.fail_listing();
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    assert_eq!(proc.process_all().await, BatchOutcome::NoPendingWork);
    assert_eq!(producer.call_count(), 0);
}

#[tokio::test]
async fn end_to_end_single_unit_scenario() {
    // One unclaimed unit; minimum length 5 leaves only the first prompt
    let source = Arc::new(MockBatchSource::new());
    source.add_unit(
        "generated-prompts-20240101.json",
        r#"{"prompts":["a red fox","ok","  "]}"#,
    );
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 1,
            produced: 1,
            failed: 0,
            claimed: 1,
        }
    );
    assert_eq!(store.stored_names(), vec!["image-20240101-1.png"]);
    assert!(source.is_claimed("generated-prompts-20240101.json"));

    // A claimed unit is excluded from the next discovery cycle
    assert_eq!(proc.process_all().await, BatchOutcome::NoPendingWork);
}

#[tokio::test]
async fn filename_uses_batch_tag_and_one_based_index() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit(
        "generated-prompts-20240101.json",
        r#"{"prompts":["first prompt","second prompt","third prompt"]}"#,
    );
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );
    proc.process_all().await;

    // Item index 2 (0-based) derives image-20240101-3.png
    assert_eq!(
        store.stored_names(),
        vec![
            "image-20240101-1.png",
            "image-20240101-2.png",
            "image-20240101-3.png",
        ]
    );
}

#[tokio::test]
async fn per_item_isolation_on_producer_failure() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit(
        "generated-prompts-20240202.json",
        r#"{"prompts":["first prompt","second prompt","third prompt"]}"#,
    );
    let producer = Arc::new(MockProducer::new());
    producer.fail_at_index(1);
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 3,
            produced: 2,
            failed: 1,
            claimed: 1,
        }
    );
    // All other items were still attempted and stored
    assert_eq!(producer.call_count(), 3);
    assert_eq!(
        store.stored_names(),
        vec!["image-20240202-1.png", "image-20240202-3.png"]
    );
    // The unit is claimed even though one item failed
    assert!(source.is_claimed("generated-prompts-20240202.json"));
}

#[tokio::test]
async fn per_item_isolation_on_store_failure() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit(
        "generated-prompts-20240303.json",
        r#"{"prompts":["first prompt","second prompt"]}"#,
    );
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());
    store.fail_for_name("image-20240303-1.png");

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 2,
            produced: 1,
            failed: 1,
            claimed: 1,
        }
    );
    // The failed artifact is lost for this attempt, not re-queued
    assert_eq!(store.stored_names(), vec!["image-20240303-2.png"]);
}

#[tokio::test]
async fn claim_failure_leaves_unit_eligible_for_next_cycle() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20240404.json", r#"{"prompts":["a red fox"]}"#);
    source.fail_claim_for("generated-prompts-20240404.json");
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 1,
            produced: 1,
            failed: 0,
            claimed: 0,
        }
    );

    // At-least-once: the unit reappears and is re-processed next cycle
    source.allow_claim_for("generated-prompts-20240404.json");
    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 1,
            produced: 1,
            failed: 0,
            claimed: 1,
        }
    );
    assert_eq!(source.claim_calls().len(), 2);
}

#[tokio::test]
async fn fetch_failure_skips_unit_without_claiming() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unfetchable_unit("generated-prompts-20240505.json");
    source.add_unit("generated-prompts-20240506.json", r#"{"prompts":["a red fox"]}"#);
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    // The unfetchable unit contributed nothing and stays unclaimed
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 1,
            produced: 1,
            failed: 0,
            claimed: 1,
        }
    );
    assert!(!source.is_claimed("generated-prompts-20240505.json"));
    assert!(source.is_claimed("generated-prompts-20240506.json"));
}

#[tokio::test]
async fn malformed_payload_contributes_zero_items_but_is_claimed() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20240606.json", "{not json");
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings::default(),
        TagMode::BatchTag,
    );

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 0,
            produced: 0,
            failed: 0,
            claimed: 1,
        }
    );
    assert_eq!(producer.call_count(), 0);
}

#[tokio::test]
async fn random_sampling_draws_exactly_batch_size_with_replacement() {
    // 3 valid prompts, 5 draws: replacement guarantees exactly 5 attempts
    let source = Arc::new(MockBatchSource::new());
    source.add_unit(
        "generated-prompts-20240707.json",
        r#"{"prompts":["first prompt","second prompt","third prompt"]}"#,
    );
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings {
            selection: SelectionMode::Random,
            batch_size: 5,
            claim_mode: ClaimMode::LeaveUnclaimed,
        },
        TagMode::Timestamp,
    )
    .with_rng_seed(7);

    let outcome = proc.process_all().await;
    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            units: 1,
            attempted: 5,
            produced: 5,
            failed: 0,
            claimed: 0,
        }
    );
    assert_eq!(producer.call_count(), 5);
    assert_eq!(store.stored_count(), 5);

    // Every drawn prompt came from the valid pool
    let valid = ["first prompt", "second prompt", "third prompt"];
    for (prompt, _) in producer.calls() {
        assert!(valid.contains(&prompt.as_str()));
    }
}

#[tokio::test]
async fn random_mode_without_claiming_re_reads_the_pool() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20240808.json", r#"{"prompts":["a red fox"]}"#);
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings {
            selection: SelectionMode::Random,
            batch_size: 2,
            claim_mode: ClaimMode::LeaveUnclaimed,
        },
        TagMode::Timestamp,
    )
    .with_rng_seed(3);

    proc.process_all().await;
    assert!(source.claim_calls().is_empty());

    // The inexhaustible pool serves the next cycle too
    let outcome = proc.process_all().await;
    assert!(matches!(outcome, BatchOutcome::Completed { attempted: 2, .. }));
}

#[tokio::test]
async fn random_mode_with_claiming_claims_after_batch_completes() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20240909.json", r#"{"prompts":["a red fox"]}"#);
    let producer = Arc::new(MockProducer::new());
    let store = Arc::new(RecordingStore::new());

    let proc = processor(
        Arc::clone(&source),
        Arc::clone(&producer),
        Arc::clone(&store),
        ProcessorSettings {
            selection: SelectionMode::Random,
            batch_size: 3,
            claim_mode: ClaimMode::ClaimUnits,
        },
        TagMode::Timestamp,
    )
    .with_rng_seed(11);

    let outcome = proc.process_all().await;
    assert!(matches!(outcome, BatchOutcome::Completed { claimed: 1, .. }));
    assert!(source.is_claimed("generated-prompts-20240909.json"));
    assert_eq!(proc.process_all().await, BatchOutcome::NoPendingWork);
}

#[tokio::test]
async fn mark_claimed_is_idempotent() {
    let source = Arc::new(MockBatchSource::new());
    source.add_unit("generated-prompts-20241010.json", r#"{"prompts":["a red fox"]}"#);

    let unit = imageflow_core::models::BatchRef::new("generated-prompts-20241010.json");
    use imageflow_core::source::BatchSource;
    source.mark_claimed(&unit).await.unwrap();
    // Second claim succeeds and leaves the claimed state unchanged
    source.mark_claimed(&unit).await.unwrap();
    assert!(source.is_claimed("generated-prompts-20241010.json"));
    assert!(source.list_pending().await.is_empty());
}
