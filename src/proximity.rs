use crate::{
    catalog::Probe,
    error::Result,
    geo::{self, LatLon},
};
use rayon::{ThreadPoolBuilder, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityMatch {
    pub probe_id: u64,
    pub ethernet_id: u64,
    pub distance_km: f64,
}

/// Index and distance of the closest candidate strictly farther than zero.
/// Ties keep the earliest candidate.
pub fn nearest(from: LatLon, candidates: &[Probe]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        let d = geo::distance_km(from, c.location);
        if d > 0.0 && best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best
}

/// For every target probe, the geographically nearest ethernet probe.
///
/// Results follow `targets` order; a target with no candidate (empty
/// `ethernet`, or only co-located candidates) has no entry.
pub fn nearest_ethernet_match(targets: &[Probe], ethernet: &[Probe]) -> Vec<ProximityMatch> {
    targets
        .iter()
        .filter_map(|t| match_one(t, ethernet))
        .collect()
}

fn match_one(target: &Probe, ethernet: &[Probe]) -> Option<ProximityMatch> {
    let (i, distance_km) = nearest(target.location, ethernet)?;
    Some(ProximityMatch {
        probe_id: target.id,
        ethernet_id: ethernet[i].id,
        distance_km,
    })
}

/// Same as [`nearest_ethernet_match`], scanned on a rayon pool of `workers`
/// threads. Output order is unchanged.
pub fn nearest_ethernet_match_parallel(
    targets: &[Probe],
    ethernet: &[Probe],
    workers: usize,
) -> Result<Vec<ProximityMatch>> {
    if workers <= 1 || targets.len() < 2 {
        return Ok(nearest_ethernet_match(targets, ethernet));
    }
    debug!(
        "proximity scan: {} targets x {} ethernet on {} workers",
        targets.len(),
        ethernet.len(),
        workers
    );

    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
    Ok(pool.install(|| {
        targets
            .par_iter()
            .filter_map(|t| match_one(t, ethernet))
            .collect()
    }))
}
