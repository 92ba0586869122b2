//! Curation worker
//!
//! Starts the task queue against the configured backends, schedules one
//! scoring task per model space and prints the resulting live result sets.
//!
//! # Usage
//!
//! ```bash
//! # Score every known model space with the layered config (config/default.toml, CURATION__*)
//! curation-worker
//!
//! # Seed synthetic data and score two spaces with the reduced task
//! curation-worker --seed-demo --model-space vision --model-space text \
//!     --task curation.score_class_outliers
//!
//! # Custom config, debug logging
//! RUST_LOG=debug curation-worker --config /path/to/config.toml
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use curation_core::config::{Config, IndexConfig, LoggingConfig};
use curation_core::stubs::{InMemoryAnnIndex, InMemoryEmbeddingStore, InMemoryResultStore};
use curation_core::traits::{AnnIndex, EmbeddingStore, ResultStore};
use curation_core::types::Embedding;
use curation_core::CoreResult;
use curation_storage::{CurationDb, HnswAnnIndex, RocksDbEmbeddingStore, RocksDbResultStore};
use curation_tasks::{InMemoryStatusBackend, TaskQueue, TaskRegistry, TaskStatus, SCORE_MODEL_SPACE};
use curation_test_utils::SpaceBuilder;

#[derive(Debug, Parser)]
#[command(name = "curation-worker", version, about = "Run outlier curation tasks")]
struct Cli {
    /// Path to a TOML configuration file (default: layered config/ + CURATION__ env)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model space to score; repeatable. Defaults to every known space.
    #[arg(long = "model-space")]
    model_spaces: Vec<String>,

    /// Registered task name
    #[arg(long, default_value = SCORE_MODEL_SPACE)]
    task: String,

    /// Ingest synthetic embeddings for each model space before scoring
    #[arg(long, default_value = "false")]
    seed_demo: bool,
}

/// Embedding store plus its ingestion path.
enum Embeddings {
    Memory(InMemoryEmbeddingStore),
    RocksDb(RocksDbEmbeddingStore),
}

impl Embeddings {
    fn store(&self) -> Arc<dyn EmbeddingStore> {
        match self {
            Embeddings::Memory(s) => Arc::new(s.clone()),
            Embeddings::RocksDb(s) => Arc::new(s.clone()),
        }
    }

    async fn ingest(&self, rows: Vec<Embedding>) -> CoreResult<usize> {
        match self {
            Embeddings::Memory(s) => {
                let n = rows.len();
                s.insert(rows).await;
                Ok(n)
            }
            Embeddings::RocksDb(s) => s.put_embeddings(rows).await,
        }
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.format.eq_ignore_ascii_case("compact") {
        builder.compact().init();
    } else {
        builder.pretty().init();
    }
}

fn open_backends(config: &Config) -> Result<(Embeddings, Arc<dyn ResultStore>)> {
    match config.storage.backend.as_str() {
        "rocksdb" => {
            let db = Arc::new(
                CurationDb::open(&config.storage.path)
                    .with_context(|| format!("opening {}", config.storage.path))?,
            );
            Ok((
                Embeddings::RocksDb(RocksDbEmbeddingStore::new(Arc::clone(&db))),
                Arc::new(RocksDbResultStore::new(db)),
            ))
        }
        _ => Ok((
            Embeddings::Memory(InMemoryEmbeddingStore::new()),
            Arc::new(InMemoryResultStore::new()),
        )),
    }
}

fn open_index(config: &IndexConfig, store: Arc<dyn EmbeddingStore>) -> Arc<dyn AnnIndex> {
    match config.backend.as_str() {
        "hnsw" => Arc::new(HnswAnnIndex::new(store, config.clone())),
        _ => Arc::new(InMemoryAnnIndex::new(store)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    init_logging(&config.logging);
    info!(
        storage = %config.storage.backend,
        index = %config.index.backend,
        task = %cli.task,
        "Curation worker starting"
    );

    let (embeddings, results) = open_backends(&config)?;
    let store = embeddings.store();

    if cli.seed_demo {
        if cli.model_spaces.is_empty() {
            bail!("--seed-demo needs at least one --model-space");
        }
        for (i, space) in cli.model_spaces.iter().enumerate() {
            let synthetic = SpaceBuilder::new(space.as_str()).seed(42 + i as u64).build();
            let written = embeddings.ingest(synthetic.all()).await?;
            info!(model_space = %space, written, "Seeded synthetic embeddings");
        }
    }

    let spaces = if cli.model_spaces.is_empty() {
        store.model_spaces().await?
    } else {
        cli.model_spaces.clone()
    };
    if spaces.is_empty() {
        warn!("No model spaces to score");
        return Ok(());
    }

    let index = open_index(&config.index, Arc::clone(&store));
    let registry =
        TaskRegistry::with_orchestrators(store, index, Arc::clone(&results), config.scoring.clone());
    let queue = TaskQueue::start(&config.tasks, registry, Arc::new(InMemoryStatusBackend::new()))?;

    let mut handles = Vec::with_capacity(spaces.len());
    for space in &spaces {
        handles.push(queue.schedule_named(&cli.task, space).await?);
    }

    let mut failed = 0usize;
    for handle in handles {
        match handle.wait().await {
            TaskStatus::Succeeded { .. } => match results.current_results(handle.model_space()).await? {
                Some(set) => println!(
                    "{}: run {} records={} random={}",
                    set.model_space,
                    set.run_id,
                    set.len(),
                    set.random_selection_count()
                ),
                None => println!("{}: no result set", handle.model_space()),
            },
            status => {
                failed += 1;
                println!("{}: {:?}", handle.model_space(), status);
            }
        }
    }

    queue.shutdown().await;
    if failed > 0 {
        bail!("{} of {} scoring tasks did not succeed", failed, spaces.len());
    }
    info!(spaces = spaces.len(), "Curation worker finished");
    Ok(())
}
