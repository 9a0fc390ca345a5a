//! Benchmark different chunk sizes with a fixed thread count.
//!
//! Run with: cargo run --release --bin bench_chunks -- -n 20k
//!
//! For per-batch phase timings, build with `--features timing` and set
//! RUST_LOG=geo_nearest=debug.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use geo_nearest::output::Discard;
use geo_nearest::{BatchEngine, Entity, EntityBatch, NearestConfig};

/// Parse an entity count such as `5000`, `20k` or `1.5m`.
fn parse_count(s: &str) -> Result<usize, String> {
    let trimmed = s.trim();
    let (digits, scale) = match trimmed.char_indices().last() {
        Some((i, 'k' | 'K')) => (&trimmed[..i], 1e3),
        Some((i, 'm' | 'M')) => (&trimmed[..i], 1e6),
        _ => (trimmed, 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|e| format!("invalid count {s:?}: {e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid count {s:?}"));
    }
    Ok((value * scale).round() as usize)
}

#[derive(Parser, Debug)]
#[command(name = "bench_chunks", about = "Benchmark chunk sizes at a fixed thread count")]
struct Args {
    /// Number of entities per batch (accepts k/m suffixes)
    #[arg(short, default_value = "10k", value_parser = parse_count)]
    n: usize,

    /// Timed runs per chunk size
    #[arg(short, long, default_value_t = 5)]
    samples: usize,

    /// Worker threads (defaults to available parallelism)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Chunk sizes to test
    #[arg(value_delimiter = ',', default_values_t = [16, 64, 256, 1024, 4096])]
    chunk_sizes: Vec<usize>,
}

/// Fibonacci-lattice positions: near-uniform over the sphere, deterministic.
fn fibonacci_batch(n: usize) -> EntityBatch {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let lat = z.asin().to_degrees();
            let lon = ((golden_angle * i as f64).to_degrees() + 180.0).rem_euclid(360.0) - 180.0;
            Entity::new(format!("F{i:07}"), lat, lon)
        })
        .collect()
}

/// Wall times of one chunk size, in milliseconds, sorted ascending.
struct Timings(Vec<f64>);

impl Timings {
    fn new(mut ms: Vec<f64>) -> Self {
        ms.sort_by(f64::total_cmp);
        Self(ms)
    }

    fn best(&self) -> f64 {
        self.0[0]
    }

    fn median(&self) -> f64 {
        let n = self.0.len();
        if n % 2 == 1 {
            self.0[n / 2]
        } else {
            (self.0[n / 2 - 1] + self.0[n / 2]) / 2.0
        }
    }

    /// Distance evaluations per microsecond at the median time.
    fn pairs_per_us(&self, n: usize) -> f64 {
        let pairs = n as f64 * n.saturating_sub(1) as f64;
        pairs / (self.median() * 1000.0)
    }
}

fn run_bench(
    batch: &Arc<EntityBatch>,
    chunk_size: usize,
    threads: usize,
    samples: usize,
) -> anyhow::Result<Timings> {
    let config = NearestConfig::default()
        .with_chunk_size(chunk_size)?
        .with_threads(Some(threads));
    let engine = BatchEngine::new(config)?;

    // Warmup
    engine.run(batch, &mut Discard)?;

    let mut times = Vec::with_capacity(samples);
    for _ in 0..samples {
        let start = Instant::now();
        let report = engine.run(batch, &mut Discard)?;
        times.push(start.elapsed().as_secs_f64() * 1000.0);
        anyhow::ensure!(report.stats.is_complete(), "incomplete batch");
    }
    Ok(Timings::new(times))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let threads = args.threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    let samples = args.samples.max(1);
    let batch = Arc::new(fibonacci_batch(args.n));

    println!("Benchmarking nearest neighbors for {} entities", args.n);
    println!("Fixed thread count: {threads}, Samples per config: {samples}");
    println!();
    println!(
        "{:>10} {:>8} {:>12} {:>10} {:>12}",
        "Chunk", "Jobs", "Median (ms)", "Best", "Pairs/us"
    );
    println!("{}", "-".repeat(56));

    let mut fastest: Option<(usize, f64)> = None;
    for &chunk_size in &args.chunk_sizes {
        let jobs = args.n.div_ceil(chunk_size.max(1));
        let timings = run_bench(&batch, chunk_size, threads, samples)?;
        let median = timings.median();
        println!(
            "{:>10} {:>8} {:>12.1} {:>10.1} {:>12.0}",
            chunk_size,
            jobs,
            median,
            timings.best(),
            timings.pairs_per_us(args.n)
        );
        if fastest.map_or(true, |(_, m)| median < m) {
            fastest = Some((chunk_size, median));
        }
    }

    if let Some((chunk_size, median)) = fastest {
        println!();
        println!("Fastest: chunk size {chunk_size} at {median:.1} ms median");
    }
    Ok(())
}
