use crate::{
    config::{Classification, TagFilter},
    country::{self, Continent},
    error::{PlanError, Result, SkipReason},
    geo::LatLon,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    Satellite,
}

impl ConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionType::Wifi => "wifi",
            ConnectionType::Cellular => "cellular",
            ConnectionType::Ethernet => "ethernet",
            ConnectionType::Satellite => "satellite",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe tags arrive either as bare strings (archive dumps) or as
/// `{name, slug}` objects (REST API).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Plain(String),
    Object { slug: String },
}

fn de_tags<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<RawTag>> = Option::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|t| match t {
            RawTag::Plain(s) => s,
            RawTag::Object { slug } => slug,
        })
        .collect())
}

/// One record of the probe catalog as downloaded.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProbe {
    pub id: u64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub status_name: Option<String>,
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub asn_v4: Option<u32>,
}

impl RawProbe {
    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    fn has_any(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.has_tag(t))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProbeDocument {
    Archive { objects: Vec<RawProbe> },
    List(Vec<RawProbe>),
}

/// Reads a probe catalog: either the archive document `{"objects": [...]}`
/// or a bare JSON array of probe records.
pub fn load_probes(path: &Path) -> Result<Vec<RawProbe>> {
    let raw = std::fs::read_to_string(path)?;
    let probes = match serde_json::from_str::<ProbeDocument>(&raw)? {
        ProbeDocument::Archive { objects } => objects,
        ProbeDocument::List(list) => list,
    };
    info!("loaded {} raw probes from {}", probes.len(), path.display());
    Ok(probes)
}

/// A classified vantage point. Immutable after classification; tags are not
/// retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub id: u64,
    pub location: LatLon,
    pub country_code: String,
    pub continent: Continent,
    pub connection_type: ConnectionType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedProbes {
    /// Kept probes, in catalog order.
    pub probes: Vec<Probe>,
    pub skipped: Vec<(u64, SkipReason)>,
}

impl ClassifiedProbes {
    pub fn of_type(&self, ct: ConnectionType) -> impl Iterator<Item = &Probe> {
        self.probes.iter().filter(move |p| p.connection_type == ct)
    }

    pub fn count(&self, ct: ConnectionType) -> usize {
        self.of_type(ct).count()
    }
}

fn matches_filter(probe: &RawProbe, filter: &TagFilter) -> bool {
    filter.required.iter().all(|t| probe.has_tag(t))
        && probe.has_any(&filter.included)
        && !probe.has_any(&filter.excluded)
}

fn matches_type(probe: &RawProbe, cfg: &Classification, ct: ConnectionType) -> bool {
    match ct {
        ConnectionType::Satellite => {
            probe.has_any(&cfg.satellite_tags)
                || probe
                    .asn_v4
                    .is_some_and(|asn| cfg.satellite_asns.contains(&asn))
        }
        ConnectionType::Wifi => matches_filter(probe, &cfg.wifi),
        ConnectionType::Cellular => matches_filter(probe, &cfg.cellular),
        ConnectionType::Ethernet => matches_filter(probe, &cfg.ethernet),
    }
}

/// Picks the connection type for one probe: the first entry of
/// `cfg.priority` whose predicate the probe satisfies.
pub fn connection_type_of(probe: &RawProbe, cfg: &Classification) -> Option<ConnectionType> {
    cfg.priority
        .iter()
        .copied()
        .find(|&ct| matches_type(probe, cfg, ct))
}

/// Filters the raw catalog down to active, classified probes.
///
/// Inactive probes, probes carrying an excluded tag, probes without
/// coordinates and probes matching no predicate are dropped with a
/// [`SkipReason`]. A kept probe whose country is not in the continent table
/// aborts classification with [`PlanError::UnknownCountry`].
pub fn classify(raw: &[RawProbe], cfg: &Classification) -> Result<ClassifiedProbes> {
    let excluded: HashSet<&str> = cfg.excluded_tags.iter().map(String::as_str).collect();
    let mut out = ClassifiedProbes::default();

    for p in raw {
        let active = p
            .status_name
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(&cfg.required_status));
        if !active {
            out.skipped.push((p.id, SkipReason::Inactive));
            continue;
        }
        if p.tags.iter().any(|t| excluded.contains(t.as_str())) {
            out.skipped.push((p.id, SkipReason::ExcludedTag));
            continue;
        }

        let Some(connection_type) = connection_type_of(p, cfg) else {
            if cfg.drop_unmatched {
                debug!("probe {} matches no connection type", p.id);
                out.skipped.push((p.id, SkipReason::Unclassified));
                continue;
            }
            // Keep-unmatched falls back to the lowest priority type.
            let Some(&last) = cfg.priority.last() else {
                out.skipped.push((p.id, SkipReason::Unclassified));
                continue;
            };
            push_probe(&mut out, p, last)?;
            continue;
        };

        push_probe(&mut out, p, connection_type)?;
    }

    info!(
        "classified {} probes (satellite={} wifi={} cellular={} ethernet={}), skipped {}",
        out.probes.len(),
        out.count(ConnectionType::Satellite),
        out.count(ConnectionType::Wifi),
        out.count(ConnectionType::Cellular),
        out.count(ConnectionType::Ethernet),
        out.skipped.len()
    );
    Ok(out)
}

fn push_probe(out: &mut ClassifiedProbes, p: &RawProbe, ct: ConnectionType) -> Result<()> {
    let (Some(lat), Some(lon)) = (p.latitude, p.longitude) else {
        out.skipped.push((p.id, SkipReason::MissingLocation));
        return Ok(());
    };
    let country_code = p
        .country_code
        .as_deref()
        .map(|c| c.trim().to_ascii_uppercase())
        .unwrap_or_default();
    let continent = country::continent_of(&country_code).map_err(|_| PlanError::UnknownCountry {
        code: country_code.clone(),
        context: format!("probe {}", p.id),
    })?;

    out.probes.push(Probe {
        id: p.id,
        location: LatLon::new(lat, lon),
        country_code,
        continent,
        connection_type: ct,
    });
    Ok(())
}
