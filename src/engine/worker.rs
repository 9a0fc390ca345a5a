//! Brute-force nearest-neighbor scan for one chunk.

use crate::{EntityBatch, LatLon, NeighborResult, WorkChunk};

/// Find the nearest other entity for every index of `chunk`.
///
/// Each index is compared against the whole batch, not just the chunk. Output
/// is one result per index in increasing index order, or nothing when the
/// batch has fewer than two entities.
pub fn nearest_in_chunk(batch: &EntityBatch, chunk: WorkChunk) -> Vec<NeighborResult> {
    let positions = batch.positions();
    if positions.len() < 2 {
        return Vec::new();
    }
    let end = chunk.end.min(positions.len());
    (chunk.begin..end)
        .map(|i| nearest_to(positions, i))
        .collect()
}

/// Scan `positions` in ascending order for the entity closest to index `i`.
///
/// Requires at least two positions. Ties keep the lower index. A NaN distance
/// never displaces a number, and a number always displaces a NaN, so rows with
/// non-finite coordinates still resolve deterministically.
#[inline]
pub(crate) fn nearest_to(positions: &[LatLon], i: usize) -> NeighborResult {
    debug_assert!(positions.len() >= 2);
    let query = positions[i];

    let first = if i == 0 { 1 } else { 0 };
    let mut best_j = first;
    let mut best_d = query.distance_km(positions[first]);

    for (j, &p) in positions.iter().enumerate().skip(first + 1) {
        if j == i {
            continue;
        }
        let d = query.distance_km(p);
        if d < best_d || (best_d.is_nan() && !d.is_nan()) {
            best_d = d;
            best_j = j;
        }
    }

    NeighborResult {
        self_index: i,
        neighbor_index: best_j,
        distance_km: best_d,
    }
}
