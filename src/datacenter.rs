use crate::{
    country::{self, Continent},
    error::{PlanError, Result},
    geo::{self, LatLon},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One measurement target. Reference data, never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datacenter {
    pub access_point_id: String,
    /// Human-readable name used in job descriptions; falls back to the city.
    pub name: String,
    pub city: String,
    pub country_code: String,
    pub continent: Continent,
    pub provider: String,
    pub location: LatLon,
}

#[derive(Debug, Deserialize)]
struct DatacenterRow {
    #[serde(alias = "AU")]
    access_point_id: String,
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Country")]
    country: String,
    #[serde(rename = "Continent", default)]
    continent: Option<String>,
    #[serde(rename = "Provider")]
    provider: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
}

impl DatacenterRow {
    fn into_datacenter(self) -> Result<Datacenter> {
        let country_code = self.country.trim().to_ascii_uppercase();
        let continent = country::continent_of(&country_code).map_err(|_| {
            PlanError::UnknownCountry {
                code: country_code.clone(),
                context: format!("datacenter {}", self.access_point_id),
            }
        })?;
        if let Some(declared) = self.continent.as_deref().filter(|c| !c.trim().is_empty())
            && Continent::parse(declared) != Some(continent)
        {
            warn!(
                "datacenter {} declares continent {} but {} is in {}; using {}",
                self.access_point_id, declared, country_code, continent, continent
            );
        }
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.city.clone());
        Ok(Datacenter {
            access_point_id: self.access_point_id.trim().to_string(),
            name,
            city: self.city,
            country_code,
            continent,
            provider: self.provider,
            location: LatLon::new(self.latitude, self.longitude),
        })
    }
}

/// Named datacenter sets the selection table refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DcGroup {
    Frankfurt,
    London,
    UsEast,
    UsWest,
    HongKong,
    Canada,
    Mumbai,
    Singapore,
    SouthAmerica,
    Oceania,
    Asia,
}

impl DcGroup {
    pub const ALL: [DcGroup; 11] = [
        DcGroup::Frankfurt,
        DcGroup::London,
        DcGroup::UsEast,
        DcGroup::UsWest,
        DcGroup::HongKong,
        DcGroup::Canada,
        DcGroup::Mumbai,
        DcGroup::Singapore,
        DcGroup::SouthAmerica,
        DcGroup::Oceania,
        DcGroup::Asia,
    ];

    pub fn contains(self, dc: &Datacenter) -> bool {
        match self {
            DcGroup::Frankfurt => dc.city == "Frankfurt am Main",
            DcGroup::London => dc.city == "London",
            DcGroup::UsEast => dc.city == "Washington" || dc.city == "Ashburn",
            DcGroup::UsWest => dc.city == "San Jose" || dc.city == "Los Angeles",
            DcGroup::HongKong => dc.country_code == "HK",
            DcGroup::Canada => dc.country_code == "CA",
            DcGroup::Mumbai => dc.country_code == "IN",
            DcGroup::Singapore => dc.country_code == "SG",
            DcGroup::SouthAmerica => dc.continent == Continent::SA,
            DcGroup::Oceania => dc.continent == Continent::OC,
            DcGroup::Asia => dc.continent == Continent::AS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatacenterCatalog {
    datacenters: Vec<Datacenter>,
}

impl DatacenterCatalog {
    /// Builds a catalog, keeping the first record of a repeated access point.
    pub fn new(datacenters: Vec<Datacenter>) -> Self {
        let mut kept: Vec<Datacenter> = Vec::with_capacity(datacenters.len());
        for dc in datacenters {
            if kept.iter().any(|k| k.access_point_id == dc.access_point_id) {
                warn!("duplicate datacenter access point {}; ignoring", dc.access_point_id);
                continue;
            }
            kept.push(dc);
        }
        Self { datacenters: kept }
    }

    /// Reads the datacenter CSV. An unknown country code is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut datacenters = Vec::new();
        for row in rdr.deserialize::<DatacenterRow>() {
            datacenters.push(row?.into_datacenter()?);
        }
        let catalog = Self::new(datacenters);
        info!(
            "loaded {} datacenters from {}",
            catalog.len(),
            path.display()
        );
        for g in DcGroup::ALL {
            if catalog.group(g).next().is_none() {
                warn!("datacenter group {:?} is empty", g);
            }
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.datacenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datacenters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Datacenter> {
        self.datacenters.iter()
    }

    pub fn get(&self, access_point_id: &str) -> Option<&Datacenter> {
        self.datacenters
            .iter()
            .find(|d| d.access_point_id == access_point_id)
    }

    pub fn group(&self, g: DcGroup) -> impl Iterator<Item = &Datacenter> {
        self.datacenters.iter().filter(move |d| g.contains(d))
    }

    /// Asian datacenters located in `country`.
    pub fn asia_in_country(&self, country: &str) -> Vec<&Datacenter> {
        self.group(DcGroup::Asia)
            .filter(|d| d.country_code == country)
            .collect()
    }

    pub fn centroid(&self, g: DcGroup) -> Option<LatLon> {
        geo::centroid(self.group(g).map(|d| d.location))
    }

    /// The group among `candidates` whose mean coordinate is closest to
    /// `from`. Empty groups are never chosen; on a tie the earlier candidate
    /// wins.
    pub fn nearest_group(&self, from: LatLon, candidates: &[DcGroup]) -> Option<DcGroup> {
        let mut best: Option<(DcGroup, f64)> = None;
        for &g in candidates {
            let Some(c) = self.centroid(g) else {
                continue;
            };
            let d = geo::distance_km(from, c);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((g, d));
            }
        }
        best.map(|(g, _)| g)
    }
}
