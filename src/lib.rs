//! Great-circle nearest neighbors for batches of geolocated entities.
//!
//! For every entity of a batch this crate finds the closest *other* entity of
//! the same batch by haversine distance. The search is a deliberate brute
//! force: the index range is split into chunks that are scanned in parallel,
//! and the per-chunk findings are merged in a fixed order so the output does
//! not depend on scheduling.
//!
//! # Example
//!
//! ```
//! use geo_nearest::{nearest_neighbors, Entity, EntityBatch};
//!
//! let batch = EntityBatch::new([
//!     Entity::new("A", 0.0, 0.0),
//!     Entity::new("B", 0.0, 1.0),
//!     Entity::new("C", 0.0, 10.0),
//! ]);
//!
//! let mapping = nearest_neighbors(batch).expect("computation should succeed");
//! assert_eq!(mapping.get("A").unwrap().identifier, "B");
//! assert_eq!(mapping.get("C").unwrap().identifier, "B");
//! ```

mod batch;
pub mod distance;
pub mod engine;
mod error;
mod mapping;
pub mod output;
pub mod source;
mod types;
pub mod validation;

use std::num::NonZeroUsize;
use std::sync::Arc;

pub use batch::{EntityBatch, DEFAULT_HEADER_SENTINEL};
pub use distance::{haversine_km, EARTH_RADIUS_KM};
pub use engine::{BatchEngine, BatchReport, BatchStats};
pub use error::NearestError;
pub use mapping::{Neighbor, ResultMapping};
pub use types::{Entity, LatLon, NeighborResult, WorkChunk};

/// Entities per job when no chunk size is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// What the engine does when a chunk job fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole batch with [`NearestError::WorkerFailed`].
    #[default]
    Abort,
    /// Skip the failed chunk and report it in [`BatchStats::failed_chunks`].
    Partial,
}

/// Configuration for nearest-neighbor computation.
#[derive(Debug, Clone)]
pub struct NearestConfig {
    /// Number of consecutive indices handled by one job.
    ///
    /// Smaller chunks balance load better across threads; larger chunks cut
    /// per-job overhead. Results never depend on this value.
    pub chunk_size: NonZeroUsize,
    /// Worker threads for a dedicated pool. `None` uses rayon's global pool.
    pub threads: Option<usize>,
    /// Identifier that marks a header record in input sources.
    pub header_sentinel: String,
    pub failure_policy: FailurePolicy,
}

impl Default for NearestConfig {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            threads: None,
            header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl NearestConfig {
    /// Set the chunk size, rejecting zero.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self, NearestError> {
        self.chunk_size = NonZeroUsize::new(chunk_size).ok_or_else(|| {
            NearestError::InvalidConfig("chunk size must be at least 1".to_string())
        })?;
        Ok(self)
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_header_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.header_sentinel = sentinel.into();
        self
    }

    pub fn validate(&self) -> Result<(), NearestError> {
        if self.threads == Some(0) {
            return Err(NearestError::InvalidConfig(
                "thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the nearest neighbor of every identifier with default settings.
pub fn nearest_neighbors(batch: EntityBatch) -> Result<ResultMapping, NearestError> {
    nearest_neighbors_with(batch, NearestConfig::default())
}

/// Resolve the nearest neighbor of every identifier with explicit configuration.
pub fn nearest_neighbors_with(
    batch: EntityBatch,
    config: NearestConfig,
) -> Result<ResultMapping, NearestError> {
    let engine = BatchEngine::new(config)?;
    let report = engine.run(&Arc::new(batch), &mut output::Discard)?;
    Ok(report.mapping)
}
