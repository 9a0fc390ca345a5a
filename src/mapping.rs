//! Identifier-keyed nearest-neighbor table.

use rustc_hash::FxHashMap;

/// The resolved neighbor of one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub identifier: String,
    pub distance_km: f64,
}

/// Accumulated `identifier -> (neighbor identifier, distance)` table.
///
/// Entries are updated in processing order with a "last write wins" rule that
/// only looks at the neighbor identifier: a new finding replaces the stored
/// one when it names a different neighbor, even if it is farther away, and is
/// ignored when it names the same neighbor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMapping {
    entries: FxHashMap<String, Neighbor>,
}

impl ResultMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding for `identifier` and return the entry now stored.
    pub fn record(&mut self, identifier: &str, neighbor: &str, distance_km: f64) -> &Neighbor {
        match self.entries.get_mut(identifier) {
            Some(entry) => {
                if entry.identifier != neighbor {
                    *entry = Neighbor {
                        identifier: neighbor.to_owned(),
                        distance_km,
                    };
                }
            }
            None => {
                self.entries.insert(
                    identifier.to_owned(),
                    Neighbor {
                        identifier: neighbor.to_owned(),
                        distance_km,
                    },
                );
            }
        }
        &self.entries[identifier]
    }

    #[inline]
    pub fn get(&self, identifier: &str) -> Option<&Neighbor> {
        self.entries.get(identifier)
    }

    #[inline]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Neighbor)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
