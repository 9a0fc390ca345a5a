//! In-order aggregation of chunk outputs into a [`ResultMapping`].

use std::collections::BTreeMap;

use tracing::warn;

use crate::output::{Row, RowSink};
use crate::{EntityBatch, FailurePolicy, NearestError, NeighborResult, ResultMapping, WorkChunk};

/// What a chunk job produced: its results, or the panic message if it died.
pub type ChunkOutcome = Result<Vec<NeighborResult>, String>;

/// A chunk whose job failed and was skipped under [`FailurePolicy::Partial`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub ordinal: usize,
    pub chunk: WorkChunk,
    pub message: String,
}

/// Totals reported once every chunk has been consumed.
#[derive(Debug, Clone, Default)]
pub struct AggregateSummary {
    pub chunks_applied: usize,
    pub results_applied: usize,
    pub failures: Vec<ChunkFailure>,
}

/// Applies chunk outputs to a mapping strictly in plan order.
///
/// Outputs may be handed over in any completion order; an output that arrives
/// before its predecessors is parked until every earlier chunk is applied.
/// Right after a chunk is applied, one row per index of that chunk is emitted
/// with the mapping entry current at that moment.
pub struct ResultAggregator<'a> {
    batch: &'a EntityBatch,
    plan: &'a [WorkChunk],
    policy: FailurePolicy,
    next: usize,
    pending: BTreeMap<usize, ChunkOutcome>,
    summary: AggregateSummary,
}

impl<'a> ResultAggregator<'a> {
    pub fn new(batch: &'a EntityBatch, plan: &'a [WorkChunk], policy: FailurePolicy) -> Self {
        Self {
            batch,
            plan,
            policy,
            next: 0,
            pending: BTreeMap::new(),
            summary: AggregateSummary::default(),
        }
    }

    /// Ordinal of the next chunk to be applied.
    #[inline]
    pub fn next_ordinal(&self) -> usize {
        self.next
    }

    /// Number of outputs received but not yet applied.
    #[inline]
    pub fn parked(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.next == self.plan.len()
    }

    /// Hand over the output of chunk `ordinal`, then apply every chunk whose
    /// turn has come.
    ///
    /// Under [`FailurePolicy::Abort`] a failed chunk stops aggregation with
    /// [`NearestError::WorkerFailed`] once its turn comes; the chunks before it
    /// have already been applied and emitted.
    pub fn accept<S: RowSink + ?Sized>(
        &mut self,
        ordinal: usize,
        outcome: ChunkOutcome,
        mapping: &mut ResultMapping,
        sink: &mut S,
    ) -> Result<(), NearestError> {
        debug_assert!(ordinal < self.plan.len(), "chunk ordinal out of range");
        debug_assert!(
            ordinal >= self.next && !self.pending.contains_key(&ordinal),
            "chunk {ordinal} delivered twice"
        );
        self.pending.insert(ordinal, outcome);

        while let Some(outcome) = self.pending.remove(&self.next) {
            let ordinal = self.next;
            self.next += 1;
            match outcome {
                Ok(results) => self.apply(ordinal, &results, mapping, sink)?,
                Err(message) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(NearestError::WorkerFailed {
                            chunk: ordinal,
                            message,
                        })
                    }
                    FailurePolicy::Partial => {
                        let chunk = self.plan[ordinal];
                        warn!(
                            chunk = ordinal,
                            begin = chunk.begin,
                            end = chunk.end,
                            %message,
                            "worker failed; skipping chunk"
                        );
                        self.summary.failures.push(ChunkFailure {
                            ordinal,
                            chunk,
                            message,
                        });
                    }
                },
            }
        }
        Ok(())
    }

    fn apply<S: RowSink + ?Sized>(
        &mut self,
        ordinal: usize,
        results: &[NeighborResult],
        mapping: &mut ResultMapping,
        sink: &mut S,
    ) -> Result<(), NearestError> {
        let chunk = self.plan[ordinal];
        debug_assert!(
            results.is_empty() || results.len() == chunk.len(),
            "chunk {ordinal} returned {} results for {} indices",
            results.len(),
            chunk.len()
        );

        for r in results {
            debug_assert!(chunk.indices().contains(&r.self_index));
            debug_assert_ne!(r.self_index, r.neighbor_index);
            mapping.record(
                self.batch.identifier(r.self_index),
                self.batch.identifier(r.neighbor_index),
                r.distance_km,
            );
        }

        for r in results {
            let identifier = self.batch.identifier(r.self_index);
            if let Some(entry) = mapping.get(identifier) {
                sink.emit(Row {
                    index: r.self_index,
                    identifier,
                    neighbor: &entry.identifier,
                    distance_km: entry.distance_km,
                })?;
            }
        }

        self.summary.chunks_applied += 1;
        self.summary.results_applied += results.len();
        Ok(())
    }

    pub fn finish(self) -> AggregateSummary {
        debug_assert!(self.pending.is_empty(), "outputs left unapplied");
        self.summary
    }
}
