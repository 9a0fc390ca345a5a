//! Core types for nearest-neighbor computation.

use bytemuck::{Pod, Zeroable};

/// A geographic position in degrees.
///
/// This type provides a small `#[repr(C)]` representation with a stable layout.
/// Coordinates are not range-checked; out-of-range or NaN values flow through
/// the distance computation as non-finite results.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in kilometers.
    #[inline]
    pub fn distance_km(self, other: Self) -> f64 {
        crate::distance::haversine_km(self.lat, self.lon, other.lat, other.lon)
    }

    /// Returns true if both coordinates are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl From<(f64, f64)> for LatLon {
    #[inline]
    fn from((lat, lon): (f64, f64)) -> Self {
        Self::new(lat, lon)
    }
}

impl From<[f64; 2]> for LatLon {
    #[inline]
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self::new(lat, lon)
    }
}

impl From<LatLon> for [f64; 2] {
    #[inline]
    fn from(p: LatLon) -> Self {
        [p.lat, p.lon]
    }
}

/// A named, geolocated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub identifier: String,
    pub position: LatLon,
}

impl Entity {
    pub fn new(identifier: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            identifier: identifier.into(),
            position: LatLon::new(lat, lon),
        }
    }
}

/// A half-open index range `[begin, end)` of a batch, handled by one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkChunk {
    pub begin: usize,
    pub end: usize,
}

impl WorkChunk {
    #[inline]
    pub const fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    #[inline]
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

/// The nearest other entity found for one index of a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborResult {
    pub self_index: usize,
    pub neighbor_index: usize,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latlon_conversions() {
        let p: LatLon = (12.5, -3.0).into();
        assert_eq!(p, LatLon::new(12.5, -3.0));
        let arr: [f64; 2] = p.into();
        assert_eq!(arr, [12.5, -3.0]);
        assert_eq!(LatLon::from(arr), p);
    }

    #[test]
    fn test_latlon_pod_layout() {
        let points = [LatLon::new(1.0, 2.0), LatLon::new(3.0, 4.0)];
        let flat: &[f64] = bytemuck::cast_slice(&points);
        assert_eq!(flat, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_latlon_is_finite() {
        assert!(LatLon::new(0.0, 0.0).is_finite());
        assert!(!LatLon::new(f64::NAN, 0.0).is_finite());
        assert!(!LatLon::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_work_chunk_len() {
        let c = WorkChunk::new(4, 9);
        assert_eq!(c.len(), 5);
        assert!(!c.is_empty());
        assert_eq!(c.indices().collect::<Vec<_>>(), vec![4, 5, 6, 7, 8]);
        assert!(WorkChunk::new(3, 3).is_empty());
    }
}
