use serde::{Deserialize, Serialize};

/// Mean Earth radius in km. Every distance in a run goes through
/// [`distance_km`], so only relative ordering matters.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance (haversine).
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Arithmetic mean of a set of coordinates; `None` for an empty set.
pub fn centroid<I>(points: I) -> Option<LatLon>
where
    I: IntoIterator<Item = LatLon>,
{
    let mut n = 0usize;
    let (mut lat, mut lon) = (0.0, 0.0);
    for p in points {
        lat += p.lat;
        lon += p.lon;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(LatLon::new(lat / n as f64, lon / n as f64))
}
