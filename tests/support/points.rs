#![allow(dead_code)]

use geo_nearest::{Entity, EntityBatch};
use glam::DVec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generate entities uniformly distributed over the sphere.
pub fn random_batch(n: usize, seed: u64) -> EntityBatch {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    random_batch_with_rng(n, &mut rng)
}

pub fn random_batch_with_rng<R: Rng + ?Sized>(n: usize, rng: &mut R) -> EntityBatch {
    (0..n)
        .map(|i| {
            let z: f64 = rng.gen_range(-1.0..1.0);
            let lat = z.asin().to_degrees();
            let lon: f64 = rng.gen_range(-180.0..180.0);
            Entity::new(format!("R{i:05}"), lat, lon)
        })
        .collect()
}

/// Generate tight clusters of entities, the typical shape of traffic data.
pub fn clustered_batch(
    clusters: usize,
    per_cluster: usize,
    spread_deg: f64,
    seed: u64,
) -> EntityBatch {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut entities = Vec::with_capacity(clusters * per_cluster);
    for c in 0..clusters {
        let lat0: f64 = rng.gen_range(-60.0..60.0);
        let lon0: f64 = rng.gen_range(-180.0..180.0);
        for k in 0..per_cluster {
            let lat = lat0 + rng.gen_range(-spread_deg..spread_deg);
            let lon = lon0 + rng.gen_range(-spread_deg..spread_deg);
            entities.push(Entity::new(format!("C{c:03}-{k:03}"), lat, lon));
        }
    }
    entities.into_iter().collect()
}

/// Re-label a batch so identifiers repeat: entity `i` becomes `ID{i % distinct}`.
pub fn with_repeated_ids(batch: &EntityBatch, distinct: usize) -> EntityBatch {
    batch
        .iter()
        .enumerate()
        .map(|(i, (_, p))| Entity::new(format!("ID{}", i % distinct), p.lat, p.lon))
        .collect()
}

fn to_unit(lat: f64, lon: f64) -> DVec3 {
    let (lat, lon) = (lat.to_radians(), lon.to_radians());
    DVec3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Independent nearest-neighbor oracle using chord length on the unit sphere,
/// which is monotonic in great-circle distance.
pub fn chord_oracle(batch: &EntityBatch) -> Vec<Option<usize>> {
    let units: Vec<DVec3> = batch
        .positions()
        .iter()
        .map(|p| to_unit(p.lat, p.lon))
        .collect();
    (0..units.len())
        .map(|i| {
            (0..units.len())
                .filter(|&j| j != i)
                .min_by(|&a, &b| {
                    let da = units[i].distance_squared(units[a]);
                    let db = units[i].distance_squared(units[b]);
                    da.total_cmp(&db)
                })
        })
        .collect()
}
