//! Great-circle distance on a fixed-radius sphere.

use std::f64::consts::PI;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[inline(always)]
fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

/// Haversine distance in kilometers between two latitude/longitude pairs
/// given in degrees.
///
/// Non-finite or out-of-range inputs are not rejected; they propagate as
/// non-finite results. The result is bit-identical when the two points are
/// swapped.
#[inline]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // Half-angle sines are squared, so taking magnitudes first keeps the sum
    // independent of argument order.
    let dlat = deg_to_rad((lat2 - lat1).abs());
    let dlon = deg_to_rad((lon2 - lon1).abs());

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let a = sin_dlat * sin_dlat
        + deg_to_rad(lat1).cos() * deg_to_rad(lat2).cos() * (sin_dlon * sin_dlon);

    let angle = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    angle * EARTH_RADIUS_KM
}
