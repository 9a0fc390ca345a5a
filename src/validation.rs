//! Invariant checks for partition plans and neighbor results.
//!
//! Useful for debugging, testing, and catching scheduling bugs. The result
//! check recomputes every candidate distance, so it is O(n^2) like the search
//! itself.

use std::fmt;

use thiserror::Error;

use crate::{haversine_km, EntityBatch, NeighborResult, WorkChunk};

/// First way in which a plan fails to partition `[0, n)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanViolation {
    #[error("chunk {ordinal} is empty")]
    EmptyChunk { ordinal: usize },
    #[error("chunk {ordinal} starts at {found}, expected {expected}")]
    Discontiguous {
        ordinal: usize,
        expected: usize,
        found: usize,
    },
    #[error("plan ends at {covered}, expected {n}")]
    WrongCoverage { covered: usize, n: usize },
}

/// Check that `plan` covers `[0, n)` with contiguous, non-overlapping,
/// non-empty chunks in ascending order.
pub fn validate_plan(plan: &[WorkChunk], n: usize) -> Result<(), PlanViolation> {
    let mut expected = 0;
    for (ordinal, chunk) in plan.iter().enumerate() {
        if chunk.begin != expected {
            return Err(PlanViolation::Discontiguous {
                ordinal,
                expected,
                found: chunk.begin,
            });
        }
        if chunk.is_empty() {
            return Err(PlanViolation::EmptyChunk { ordinal });
        }
        expected = chunk.end;
    }
    if expected != n {
        return Err(PlanViolation::WrongCoverage { covered: expected, n });
    }
    Ok(())
}

/// Detailed validation report for a batch's neighbor results.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Number of entities in the batch.
    pub num_entities: usize,
    /// Number of results checked.
    pub num_results: usize,
    /// Indices with no result (n >= 2) or results for a batch with n < 2.
    pub missing: Vec<usize>,
    /// Indices with more than one result.
    pub duplicates: Vec<usize>,
    /// Results naming an index outside the batch.
    pub out_of_range: usize,
    /// Results that name themselves as neighbor.
    pub self_neighbors: Vec<usize>,
    /// Results whose stored distance differs from the recomputed one.
    pub distance_mismatches: Vec<usize>,
    /// Results where another entity is strictly closer, or equally close with
    /// a lower index.
    pub not_nearest: Vec<usize>,
    /// Results with a non-finite distance (reported, not an error).
    pub non_finite: usize,
}

impl ValidationReport {
    /// True if every structural and minimality check passed.
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
            && self.duplicates.is_empty()
            && self.out_of_range == 0
            && self.self_neighbors.is_empty()
            && self.distance_mismatches.is_empty()
            && self.not_nearest.is_empty()
    }

    /// Format a summary of any issues found.
    pub fn summary(&self) -> String {
        if self.is_valid() {
            return "Valid".to_string();
        }
        let mut issues = Vec::new();
        if !self.missing.is_empty() {
            issues.push(format!("{} missing", self.missing.len()));
        }
        if !self.duplicates.is_empty() {
            issues.push(format!("{} duplicated", self.duplicates.len()));
        }
        if self.out_of_range > 0 {
            issues.push(format!("{} out of range", self.out_of_range));
        }
        if !self.self_neighbors.is_empty() {
            issues.push(format!("{} self neighbors", self.self_neighbors.len()));
        }
        if !self.distance_mismatches.is_empty() {
            issues.push(format!(
                "{} distance mismatches",
                self.distance_mismatches.len()
            ));
        }
        if !self.not_nearest.is_empty() {
            issues.push(format!("{} not nearest", self.not_nearest.len()));
        }
        issues.join(", ")
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} results for {} entities: {}",
            self.num_results,
            self.num_entities,
            self.summary()
        )
    }
}

fn same_distance(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

/// Check `results` against `batch`: one result per index, no self matches,
/// and each neighbor is the lowest-index entity at the minimum distance.
pub fn validate_results(batch: &EntityBatch, results: &[NeighborResult]) -> ValidationReport {
    let n = batch.len();
    let mut report = ValidationReport {
        num_entities: n,
        num_results: results.len(),
        ..Default::default()
    };

    if n < 2 {
        report.missing = results.iter().map(|r| r.self_index).collect();
        return report;
    }

    let mut seen = vec![0u32; n];
    for r in results {
        if r.self_index >= n || r.neighbor_index >= n {
            report.out_of_range += 1;
            continue;
        }
        seen[r.self_index] += 1;
        if r.self_index == r.neighbor_index {
            report.self_neighbors.push(r.self_index);
            continue;
        }
        if !r.distance_km.is_finite() {
            report.non_finite += 1;
        }

        let q = batch.position(r.self_index);
        let p = batch.position(r.neighbor_index);
        if !same_distance(haversine_km(q.lat, q.lon, p.lat, p.lon), r.distance_km) {
            report.distance_mismatches.push(r.self_index);
            continue;
        }

        let beaten = (0..n).filter(|&j| j != r.self_index).any(|j| {
            let c = batch.position(j);
            let d = haversine_km(q.lat, q.lon, c.lat, c.lon);
            if r.distance_km.is_nan() {
                // A NaN result is only acceptable when nothing is comparable.
                !d.is_nan() || j < r.neighbor_index
            } else {
                d < r.distance_km || (d == r.distance_km && j < r.neighbor_index)
            }
        });
        if beaten {
            report.not_nearest.push(r.self_index);
        }
    }

    for (i, &count) in seen.iter().enumerate() {
        match count {
            0 => report.missing.push(i),
            1 => {}
            _ => report.duplicates.push(i),
        }
    }
    report
}
