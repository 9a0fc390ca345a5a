//! Report the nearest other entity for every row of every CSV file in a
//! directory.
//!
//! Run with: cargo run --release --bin nearest -- ../data
//!
//! Usage:
//!   nearest                     Process ../data
//!   nearest data/ -c 64 -j 8    Chunks of 64 entities on 8 threads
//!   nearest data/ --accumulate  Carry one result table across all files
//!
//! Logging goes to stderr and honors RUST_LOG; stdout carries only results.

use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use geo_nearest::output::WriterSink;
use geo_nearest::source::{discover_sources, load_batch};
use geo_nearest::{
    BatchEngine, FailurePolicy, NearestConfig, NearestError, ResultMapping,
    DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_SENTINEL,
};

#[derive(Parser, Debug)]
#[command(name = "nearest", version)]
#[command(about = "Find the great-circle nearest neighbor of every entity in each CSV file")]
struct Cli {
    /// Directory containing `identifier,latitude,longitude` CSV files
    #[arg(default_value = "../data")]
    dir: PathBuf,

    /// Entities handled by one concurrent job
    #[arg(short, long, env = "GEO_NEAREST_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Worker threads (defaults to one per CPU)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Identifier value that marks a header record
    #[arg(long, default_value = DEFAULT_HEADER_SENTINEL)]
    header: String,

    /// Keep results of healthy chunks when a job fails, instead of dropping the file
    #[arg(long)]
    partial: bool,

    /// Carry one result table across all files instead of one per file
    #[arg(long)]
    accumulate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "geo_nearest=debug,nearest=debug"
    } else {
        "geo_nearest=info,nearest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let policy = if cli.partial {
        FailurePolicy::Partial
    } else {
        FailurePolicy::Abort
    };
    let config = NearestConfig::default()
        .with_chunk_size(cli.chunk_size)?
        .with_threads(cli.threads)
        .with_header_sentinel(cli.header)
        .with_failure_policy(policy);
    let engine = BatchEngine::new(config)?;

    let sources = discover_sources(&cli.dir)
        .with_context(|| format!("listing input directory {}", cli.dir.display()))?;
    info!(dir = %cli.dir.display(), sources = sources.len(), "discovered sources");

    let stdout = io::stdout();
    let mut sink = WriterSink::new(BufWriter::new(stdout.lock()));
    let mut shared = ResultMapping::new();
    let mut skipped = 0usize;
    let mut failed = 0usize;

    for path in &sources {
        let batch = match load_batch(path, &engine.config().header_sentinel) {
            Ok(batch) => Arc::new(batch),
            Err(e) if e.is_source_local() => {
                warn!(path = %path.display(), error = %e, "skipping source");
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        sink.line(&format!("Processed CSV file '{}':", path.display()))?;
        let outcome = if cli.accumulate {
            engine.run_into(&batch, &mut shared, &mut sink)
        } else {
            engine.run(&batch, &mut sink).map(|report| report.stats)
        };

        match outcome {
            Ok(stats) if !stats.failed_chunks.is_empty() => {
                warn!(
                    path = %path.display(),
                    failed_chunks = stats.failed_chunks.len(),
                    resolved = stats.resolved,
                    entities = stats.entities,
                    "source processed partially"
                );
            }
            Ok(_) => {}
            Err(e @ NearestError::WorkerFailed { .. }) => {
                error!(path = %path.display(), error = %e, "source aborted");
                failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    sink.flush()?;

    info!(
        processed = sources.len() - skipped - failed,
        skipped, failed, "done"
    );
    if failed > 0 {
        bail!("{failed} source(s) aborted after a worker failure");
    }
    Ok(())
}
