#![allow(dead_code)]

use atlas_plan::{
    catalog::{ConnectionType, Probe},
    country,
    datacenter::{Datacenter, DatacenterCatalog},
    geo::LatLon,
};
use std::path::PathBuf;

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn datacenters() -> DatacenterCatalog {
    DatacenterCatalog::load(&fixture("datacenters.csv")).expect("load datacenters fixture")
}

/// The fixture catalog with a second provider next to every datacenter,
/// listed after all of the first provider's.
pub fn two_provider_datacenters() -> DatacenterCatalog {
    let mut dcs: Vec<Datacenter> = datacenters().iter().cloned().collect();
    let second: Vec<Datacenter> = dcs
        .iter()
        .map(|d| {
            let mut g = d.clone();
            g.access_point_id = format!("gce.{}", d.access_point_id);
            g.provider = "Google Cloud".into();
            g
        })
        .collect();
    dcs.extend(second);
    DatacenterCatalog::new(dcs)
}

pub fn probe(id: u64, country_code: &str, lat: f64, lon: f64, ct: ConnectionType) -> Probe {
    Probe {
        id,
        location: LatLon::new(lat, lon),
        country_code: country_code.to_string(),
        continent: country::continent_of(country_code).expect("known country"),
        connection_type: ct,
    }
}
