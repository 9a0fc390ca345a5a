//! Immutable, indexed entity collections.

use std::ops::Index;

use crate::{Entity, LatLon, NearestError};

/// Identifier value that marks a header record in the original data files.
pub const DEFAULT_HEADER_SENTINEL: &str = "callsign";

/// All entities of one input source, in source order.
///
/// A batch is never mutated after construction, so it can be shared between
/// concurrent jobs (see [`BatchEngine`](crate::BatchEngine)) behind an `Arc`.
/// Identifiers and positions are stored in separate arrays so the distance
/// scan touches only coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBatch {
    identifiers: Vec<String>,
    positions: Vec<LatLon>,
}

impl EntityBatch {
    /// Build a batch from already-parsed entities.
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        let (identifiers, positions) = entities
            .into_iter()
            .map(|e| (e.identifier, e.position))
            .unzip();
        Self {
            identifiers,
            positions,
        }
    }

    /// Build a batch from raw `(identifier, latitude, longitude)` text triples.
    ///
    /// Every record whose identifier equals `header_sentinel` is skipped,
    /// wherever it appears. The first non-numeric coordinate aborts
    /// construction with [`NearestError::Parse`]; deciding whether that loses
    /// the whole source is up to the caller.
    pub fn from_records<I, S>(records: I, header_sentinel: &str) -> Result<Self, NearestError>
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        let mut batch = Self::default();
        for (record_idx, (identifier, lat, lon)) in records.into_iter().enumerate() {
            let identifier = identifier.as_ref();
            if identifier == header_sentinel {
                continue;
            }
            let record = record_idx + 1;
            let lat = parse_coordinate(lat.as_ref(), record, "latitude")?;
            let lon = parse_coordinate(lon.as_ref(), record, "longitude")?;
            batch.identifiers.push(identifier.to_owned());
            batch.positions.push(LatLon::new(lat, lon));
        }
        Ok(batch)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn identifier(&self, index: usize) -> &str {
        &self.identifiers[index]
    }

    #[inline]
    pub fn position(&self, index: usize) -> LatLon {
        self.positions[index]
    }

    /// Coordinates in index order.
    #[inline]
    pub fn positions(&self) -> &[LatLon] {
        &self.positions
    }

    /// Iterate `(identifier, position)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, LatLon)> + '_ {
        self.identifiers
            .iter()
            .map(String::as_str)
            .zip(self.positions.iter().copied())
    }

    /// Number of distinct identifiers in the batch.
    pub fn distinct_identifiers(&self) -> usize {
        self.identifiers
            .iter()
            .map(String::as_str)
            .collect::<rustc_hash::FxHashSet<_>>()
            .len()
    }
}

impl Index<usize> for EntityBatch {
    type Output = LatLon;

    #[inline]
    fn index(&self, index: usize) -> &LatLon {
        &self.positions[index]
    }
}

impl FromIterator<Entity> for EntityBatch {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        Self::new(iter)
    }
}

fn parse_coordinate(text: &str, record: usize, field: &'static str) -> Result<f64, NearestError> {
    text.trim().parse::<f64>().map_err(|_| NearestError::Parse {
        record,
        field,
        value: text.to_owned(),
    })
}
