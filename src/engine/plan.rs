//! Partitioning of a batch's index range into work chunks.

use std::num::NonZeroUsize;

use crate::WorkChunk;

/// Split `[0, n)` into contiguous chunks of `chunk_size` indices.
///
/// The last chunk may be shorter. The returned order is both the dispatch
/// order and the aggregation order.
pub fn plan(n: usize, chunk_size: NonZeroUsize) -> Vec<WorkChunk> {
    let k = chunk_size.get();
    let mut chunks = Vec::with_capacity(n.div_ceil(k));
    let mut begin = 0;
    while begin < n {
        let end = begin.saturating_add(k).min(n);
        chunks.push(WorkChunk::new(begin, end));
        begin = end;
    }
    chunks
}
