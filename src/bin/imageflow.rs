//! # Imageflow Pipeline Binary
//!
//! Wires configuration into the pipeline components and drives them in one
//! of three modes: a one-shot batch run, the continuous fixed-interval loop,
//! or a standalone artifact indexing pass. Missing or invalid configuration
//! is the single fatal path and exits non-zero before any work starts.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use imageflow_core::config::{ConfigManager, ImageflowConfig, SinkBackend, SourceBackend};
use imageflow_core::models::ArtifactNamer;
use imageflow_core::parser::PromptParser;
use imageflow_core::processor::{BatchProcessor, ProcessorSettings};
use imageflow_core::producer::{HttpImageProducer, HttpProducerSettings};
use imageflow_core::sink::{
    ArtifactStore, BucketArtifactStore, BucketStoreSettings, FilesystemArtifactStore,
};
use imageflow_core::source::{BatchSource, DatabaseBatchSource, FilesystemBatchSource};
use imageflow_core::{ArtifactIndexer, OutcomePublisher, PipelineScheduler};

#[derive(Parser)]
#[command(name = "imageflow")]
#[command(about = "Prompt-to-image batch pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: ./config, or IMAGEFLOW_CONFIG_DIR)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process pending batches once and exit
    Run,
    /// Poll for pending batches on a fixed interval until interrupted
    Serve,
    /// Catalog stored artifacts once and exit
    Index,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    imageflow_core::init_structured_logging();

    let manager = match ConfigManager::load_from_directory(cli.config_dir) {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "Configuration loading failed");
            std::process::exit(1);
        }
    };
    let config = manager.config().clone();

    match cli.command {
        Commands::Run => {
            let scheduler = build_scheduler(&config).await?;
            let outcome = scheduler.run_once().await;
            info!(outcome = ?outcome, "One-shot run finished");
        }
        Commands::Serve => {
            let scheduler = Arc::new(build_scheduler(&config).await?);

            let shutdown_handle = Arc::clone(&scheduler);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, stopping after current batch");
                    shutdown_handle.stop();
                }
            });

            scheduler.run().await;
        }
        Commands::Index => {
            let store = build_store(&config).await?;
            let pool = connect_pool(&config)
                .await?
                .context("indexing requires database.url")?;
            let report = ArtifactIndexer::new(pool, store).run().await?;
            info!(report = ?report, "Indexing finished");
        }
    }

    Ok(())
}

/// Build the full pipeline from configuration
async fn build_scheduler(config: &ImageflowConfig) -> anyhow::Result<PipelineScheduler> {
    let http = reqwest::Client::new();
    let pool = connect_pool(config).await?;

    let source = build_source(config, pool.clone())?;
    let store = build_store(config).await?;

    let api_key = require_env(&config.producer.api_key_env)?;
    let producer = Arc::new(HttpImageProducer::new(
        http,
        HttpProducerSettings {
            endpoint: config.producer.endpoint.clone(),
            model: config.producer.model.clone(),
            image_size: config.producer.image_size.clone(),
            api_key,
        },
    ));

    let processor = Arc::new(BatchProcessor::new(
        source,
        producer,
        Arc::clone(&store),
        PromptParser::new(config.processor.min_prompt_chars),
        ArtifactNamer::standard(config.processor.tag_mode),
        ProcessorSettings {
            selection: config.processor.selection,
            batch_size: config.processor.batch_size,
            claim_mode: config.processor.claim_mode,
        },
    ));

    let mut scheduler = PipelineScheduler::new(
        processor,
        OutcomePublisher::default(),
        Duration::from_secs(config.scheduler.interval_seconds),
    );

    if config.indexer.enabled {
        let pool = pool.context("indexer.enabled requires database.url")?;
        scheduler = scheduler.with_indexer(Arc::new(ArtifactIndexer::new(pool, store)));
    }

    Ok(scheduler)
}

async fn connect_pool(config: &ImageflowConfig) -> anyhow::Result<Option<PgPool>> {
    let Some(url) = &config.database.url else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(config.database.pool)
        .connect(url)
        .await
        .context("database connection failed")?;
    Ok(Some(pool))
}

fn build_source(
    config: &ImageflowConfig,
    pool: Option<PgPool>,
) -> anyhow::Result<Arc<dyn BatchSource>> {
    let source: Arc<dyn BatchSource> = match config.source.backend {
        SourceBackend::Filesystem => Arc::new(FilesystemBatchSource::new(
            &config.source.prompt_dir,
            config.source.discovery,
            config.source.order,
        )),
        SourceBackend::Database => {
            let pool = pool.context("source.backend = database requires database.url")?;
            Arc::new(DatabaseBatchSource::new(
                pool,
                config.source.discovery,
                config.source.order,
            ))
        }
    };
    Ok(source)
}

async fn build_store(config: &ImageflowConfig) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    let store: Arc<dyn ArtifactStore> = match config.sink.backend {
        SinkBackend::Filesystem => {
            let store = FilesystemArtifactStore::new(&config.sink.image_dir);
            store.ensure_dir().await?;
            Arc::new(store)
        }
        SinkBackend::Bucket => {
            let bucket = config
                .sink
                .bucket
                .as_ref()
                .context("sink.backend = bucket requires a sink.bucket section")?;
            let api_key = require_env(&bucket.api_key_env)?;
            Arc::new(BucketArtifactStore::new(
                reqwest::Client::new(),
                BucketStoreSettings {
                    endpoint: bucket.endpoint.clone(),
                    bucket: bucket.bucket.clone(),
                    api_key,
                },
            ))
        }
    };
    Ok(store)
}

fn require_env(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("required environment variable {name} is not set"),
    }
}
