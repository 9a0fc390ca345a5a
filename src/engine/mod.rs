//! Chunked, parallel brute-force nearest-neighbor engine.
//!
//! A batch's index range is split into fixed-size chunks ([`plan`]); every
//! chunk becomes one rayon job that scans the whole batch for each of its
//! indices ([`nearest_in_chunk`]). Jobs share the batch through an `Arc` and
//! send their outputs back over a channel. The calling thread is the only
//! writer of the [`ResultMapping`]: it applies outputs in plan order through a
//! [`ResultAggregator`], regardless of completion order.

mod aggregate;
mod plan;
mod timing;
mod worker;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

pub use aggregate::{AggregateSummary, ChunkFailure, ChunkOutcome, ResultAggregator};
pub use plan::plan;
pub use timing::BatchTimings;
pub use worker::nearest_in_chunk;

use timing::{Timer, TimingBuilder};

use crate::output::RowSink;
use crate::validation::validate_plan;
use crate::{EntityBatch, NearestConfig, NearestError, NeighborResult, ResultMapping, WorkChunk};

type Kernel = fn(&EntityBatch, WorkChunk) -> Vec<NeighborResult>;

/// Per-batch counters and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    /// Entities in the batch.
    pub entities: usize,
    /// Chunks dispatched.
    pub chunks: usize,
    /// Neighbor results applied to the mapping.
    pub resolved: usize,
    /// Chunks skipped under [`FailurePolicy::Partial`](crate::FailurePolicy::Partial).
    pub failed_chunks: Vec<ChunkFailure>,
    pub timings: BatchTimings,
}

impl BatchStats {
    /// True if every entity got a result.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks.is_empty() && (self.entities < 2 || self.resolved == self.entities)
    }
}

/// Output of [`BatchEngine::run`]: the batch's own mapping plus its stats.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub mapping: ResultMapping,
    pub stats: BatchStats,
}

/// Drives batches through plan, parallel scan and in-order aggregation.
pub struct BatchEngine {
    config: NearestConfig,
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
    kernel: Kernel,
}

impl BatchEngine {
    /// Create an engine. A dedicated thread pool is built when
    /// `config.threads` is set; otherwise jobs run on rayon's global pool.
    pub fn new(config: NearestConfig) -> Result<Self, NearestError> {
        config.validate()?;

        #[cfg(feature = "parallel")]
        let pool = match config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("geo-nearest-{i}"))
                    .build()
                    .map_err(|e| NearestError::InvalidConfig(e.to_string()))?;
                Some(Arc::new(pool))
            }
            None => None,
        };

        Ok(Self {
            config,
            #[cfg(feature = "parallel")]
            pool,
            kernel: nearest_in_chunk,
        })
    }

    #[cfg(test)]
    fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    #[inline]
    pub fn config(&self) -> &NearestConfig {
        &self.config
    }

    /// Process one batch into a fresh mapping.
    ///
    /// Rows are emitted to `sink` in index order as soon as their chunk has
    /// been applied.
    pub fn run<S: RowSink + ?Sized>(
        &self,
        batch: &Arc<EntityBatch>,
        sink: &mut S,
    ) -> Result<BatchReport, NearestError> {
        let mut mapping = ResultMapping::new();
        let stats = self.run_into(batch, &mut mapping, sink)?;
        Ok(BatchReport { mapping, stats })
    }

    /// Process one batch into a caller-owned mapping.
    ///
    /// Use this to carry one table across several batches: entries left by
    /// earlier batches are updated under the same rules as repeated
    /// identifiers within a batch.
    pub fn run_into<S: RowSink + ?Sized>(
        &self,
        batch: &Arc<EntityBatch>,
        mapping: &mut ResultMapping,
        sink: &mut S,
    ) -> Result<BatchStats, NearestError> {
        let n = batch.len();
        if n < 2 {
            debug!(n, "fewer than two entities; no neighbors to resolve");
            return Ok(BatchStats {
                entities: n,
                ..Default::default()
            });
        }

        let mut tb = TimingBuilder::new();

        let t = Timer::start();
        let chunks = plan(n, self.config.chunk_size);
        tb.set_plan(t.elapsed());
        debug_assert!(
            validate_plan(&chunks, n).is_ok(),
            "invalid plan for n={n}: {:?}",
            validate_plan(&chunks, n)
        );

        let mut aggregator = ResultAggregator::new(batch, &chunks, self.config.failure_policy);
        self.drive(batch, &chunks, &mut aggregator, mapping, sink, &mut tb)?;
        let summary = aggregator.finish();

        let timings = tb.finish();
        timings.report(n, chunks.len());
        debug!(
            n,
            chunks = chunks.len(),
            resolved = summary.results_applied,
            failed = summary.failures.len(),
            "batch complete"
        );

        Ok(BatchStats {
            entities: n,
            chunks: chunks.len(),
            resolved: summary.results_applied,
            failed_chunks: summary.failures,
            timings,
        })
    }

    #[cfg(feature = "parallel")]
    fn drive<S: RowSink + ?Sized>(
        &self,
        batch: &Arc<EntityBatch>,
        chunks: &[WorkChunk],
        aggregator: &mut ResultAggregator<'_>,
        mapping: &mut ResultMapping,
        sink: &mut S,
        tb: &mut TimingBuilder,
    ) -> Result<(), NearestError> {
        use std::sync::mpsc;

        // Blocking on the channel from a worker of the target pool could starve
        // the jobs we wait on.
        if chunks.len() <= 1 || self.on_pool_thread() {
            return self.drive_sequential(batch, chunks, aggregator, mapping, sink, tb);
        }

        let t = Timer::start();
        let (tx, rx) = mpsc::channel::<(usize, ChunkOutcome)>();
        for (ordinal, &chunk) in chunks.iter().enumerate() {
            let tx = tx.clone();
            let batch = Arc::clone(batch);
            let kernel = self.kernel;
            let job = move || {
                let outcome = run_chunk(kernel, &batch, chunk);
                // The receiver is gone only if aggregation already aborted.
                let _ = tx.send((ordinal, outcome));
            };
            match &self.pool {
                Some(pool) => pool.spawn(job),
                None => rayon::spawn(job),
            }
        }
        drop(tx);
        tb.set_dispatch(t.elapsed());

        let t = Timer::start();
        for (ordinal, outcome) in rx.iter() {
            aggregator.accept(ordinal, outcome, mapping, sink)?;
            if aggregator.is_complete() {
                break;
            }
        }
        tb.set_drain(t.elapsed());

        if !aggregator.is_complete() {
            return Err(NearestError::WorkerFailed {
                chunk: aggregator.next_ordinal(),
                message: "job exited without reporting".to_string(),
            });
        }
        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn drive<S: RowSink + ?Sized>(
        &self,
        batch: &Arc<EntityBatch>,
        chunks: &[WorkChunk],
        aggregator: &mut ResultAggregator<'_>,
        mapping: &mut ResultMapping,
        sink: &mut S,
        tb: &mut TimingBuilder,
    ) -> Result<(), NearestError> {
        self.drive_sequential(batch, chunks, aggregator, mapping, sink, tb)
    }

    fn drive_sequential<S: RowSink + ?Sized>(
        &self,
        batch: &Arc<EntityBatch>,
        chunks: &[WorkChunk],
        aggregator: &mut ResultAggregator<'_>,
        mapping: &mut ResultMapping,
        sink: &mut S,
        tb: &mut TimingBuilder,
    ) -> Result<(), NearestError> {
        let t = Timer::start();
        for (ordinal, &chunk) in chunks.iter().enumerate() {
            let outcome = run_chunk(self.kernel, batch, chunk);
            aggregator.accept(ordinal, outcome, mapping, sink)?;
        }
        tb.set_drain(t.elapsed());
        Ok(())
    }

    #[cfg(feature = "parallel")]
    fn on_pool_thread(&self) -> bool {
        match &self.pool {
            Some(pool) => pool.current_thread_index().is_some(),
            None => rayon::current_thread_index().is_some(),
        }
    }
}

fn run_chunk(kernel: Kernel, batch: &EntityBatch, chunk: WorkChunk) -> ChunkOutcome {
    panic::catch_unwind(AssertUnwindSafe(|| kernel(batch, chunk)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{CollectSink, Discard};
    use crate::{Entity, FailurePolicy};

    fn line_batch(n: usize) -> Arc<EntityBatch> {
        // Irregular spacing along the equator so every nearest neighbor is unique.
        let batch: EntityBatch = (0..n)
            .map(|i| {
                let lon = i as f64 * 1.5 + (i * i % 7) as f64 * 0.1;
                Entity::new(format!("P{i}"), 0.0, lon)
            })
            .collect();
        Arc::new(batch)
    }

    fn engine(chunk_size: usize, threads: Option<usize>) -> BatchEngine {
        let config = NearestConfig::default()
            .with_chunk_size(chunk_size)
            .unwrap()
            .with_threads(threads);
        BatchEngine::new(config).unwrap()
    }

    fn panics_on_second_chunk(batch: &EntityBatch, chunk: WorkChunk) -> Vec<NeighborResult> {
        if chunk.begin == 4 {
            panic!("injected failure");
        }
        nearest_in_chunk(batch, chunk)
    }

    #[test]
    fn test_rows_emitted_in_index_order() {
        let batch = line_batch(37);
        let mut sink = CollectSink::default();
        let report = engine(5, Some(4)).run(&batch, &mut sink).unwrap();

        assert_eq!(report.stats.chunks, 8);
        assert_eq!(report.stats.resolved, 37);
        assert!(report.stats.is_complete());
        let idx: Vec<usize> = sink.rows.iter().map(|r| r.index).collect();
        assert_eq!(idx, (0..37).collect::<Vec<_>>());
    }

    #[test]
    fn test_chunk_size_and_threads_do_not_change_results() {
        let batch = line_batch(50);
        let mut reference = CollectSink::default();
        let expected = engine(50, Some(1)).run(&batch, &mut reference).unwrap();

        for (k, threads) in [(1, Some(3)), (7, None), (13, Some(8)), (49, Some(2))] {
            let mut sink = CollectSink::default();
            let got = engine(k, threads).run(&batch, &mut sink).unwrap();
            assert_eq!(got.mapping, expected.mapping, "k={k}");
            assert_eq!(sink.rows, reference.rows, "k={k}");
        }
    }

    #[test]
    fn test_small_batches_yield_empty_mapping() {
        for n in [0, 1] {
            let report = engine(4, None).run(&line_batch(n), &mut Discard).unwrap();
            assert!(report.mapping.is_empty());
            assert_eq!(report.stats.entities, n);
            assert_eq!(report.stats.chunks, 0);
            assert!(report.stats.is_complete());
        }
    }

    #[test]
    fn test_abort_policy_surfaces_worker_failure() {
        let batch = line_batch(12);
        let engine = engine(4, Some(2)).with_kernel(panics_on_second_chunk);
        let mut sink = CollectSink::default();
        let err = engine.run(&batch, &mut sink).unwrap_err();
        match err {
            NearestError::WorkerFailed { chunk, message } => {
                assert_eq!(chunk, 1);
                assert!(message.contains("injected failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Only the chunk ahead of the failure was emitted.
        assert_eq!(sink.rows.len(), 4);
    }

    #[test]
    fn test_partial_policy_keeps_healthy_chunks() {
        let batch = line_batch(12);
        let config = NearestConfig {
            failure_policy: FailurePolicy::Partial,
            ..NearestConfig::default().with_chunk_size(4).unwrap()
        };
        let engine = BatchEngine::new(config)
            .unwrap()
            .with_kernel(panics_on_second_chunk);

        let report = engine.run(&batch, &mut Discard).unwrap();
        assert_eq!(report.stats.failed_chunks.len(), 1);
        assert_eq!(report.stats.failed_chunks[0].chunk, WorkChunk::new(4, 8));
        assert_eq!(report.stats.resolved, 8);
        assert!(!report.stats.is_complete());
        assert_eq!(report.mapping.len(), 8);
        assert!(!report.mapping.contains("P5"));
    }

    #[test]
    fn test_run_into_accumulates_across_batches() {
        let engine = engine(2, None);
        let first = Arc::new(EntityBatch::new([
            Entity::new("X", 0.0, 0.0),
            Entity::new("Y", 0.0, 1.0),
        ]));
        let second = Arc::new(EntityBatch::new([
            Entity::new("X", 0.0, 0.0),
            Entity::new("Z", 0.0, 2.0),
        ]));

        let mut shared = ResultMapping::new();
        engine.run_into(&first, &mut shared, &mut Discard).unwrap();
        engine.run_into(&second, &mut shared, &mut Discard).unwrap();
        assert_eq!(shared.len(), 3);
        assert_eq!(shared.get("X").unwrap().identifier, "Z");
        assert_eq!(shared.get("Y").unwrap().identifier, "X");

        // Without opting in, each batch gets its own table.
        let report = engine.run(&second, &mut Discard).unwrap();
        assert_eq!(report.mapping.len(), 2);
        assert!(!report.mapping.contains("Y"));
    }

    #[test]
    fn test_uneven_plans_resolve_every_index() {
        use crate::validation::validate_results;

        for n in [2, 3, 10, 31] {
            let batch = line_batch(n);
            for k in [1, 3, 4, n - 1, n, n + 5] {
                let report = engine(k, Some(3)).run(&batch, &mut Discard).unwrap();
                assert_eq!(report.stats.chunks, n.div_ceil(k), "n={n} k={k}");
                assert_eq!(report.stats.resolved, n, "n={n} k={k}");

                let results: Vec<_> = plan(n, nz(k))
                    .into_iter()
                    .flat_map(|c| nearest_in_chunk(&batch, c))
                    .collect();
                let validation = validate_results(&batch, &results);
                assert!(validation.is_valid(), "n={n} k={k}: {validation}");
            }
        }
    }

    fn nz(k: usize) -> std::num::NonZeroUsize {
        std::num::NonZeroUsize::new(k).unwrap()
    }

    #[test]
    fn test_panic_message_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
