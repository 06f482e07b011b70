use crate::{
    catalog::{ConnectionType, Probe},
    country::Continent,
    datacenter::DatacenterCatalog,
    error::{Result, SkipReason},
    refine,
    selector::{self, Scenario},
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// One planned measurement. Also the row layout of `mapping.csv`, which is
/// later joined against measurement results on `(probe_id, access_point_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    pub probe_id: u64,
    pub access_point_id: String,
    pub scenario: Scenario,
    pub probe_country: String,
    pub probe_continent: Continent,
    pub connection_type: ConnectionType,
    pub dc_city: String,
    pub dc_country: String,
    pub dc_continent: Continent,
    pub dc_provider: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingTable {
    pub rows: Vec<MappingRow>,
    pub skipped: Vec<(u64, SkipReason)>,
}

impl MappingTable {
    /// Runs the selector over every probe and collects coarse rows.
    /// `(probe_id, access_point_id)` pairs are unique; each skip reason is
    /// recorded once per probe.
    pub fn build(probes: &[Probe], catalog: &DatacenterCatalog, provider_fanout: bool) -> Self {
        let mut table = MappingTable::default();

        for probe in probes {
            let picks = selector::pick(probe, catalog, provider_fanout);
            for reason in &picks.dropped {
                match reason {
                    SkipReason::NoSelectorBranch => warn!(
                        "probe {} in continent {} has no datacenter selection; skipped",
                        probe.id, probe.continent
                    ),
                    other => debug!("probe {}: {:?}", probe.id, other),
                }
                table.skipped.push((probe.id, *reason));
            }

            for (dc, scenario) in picks.targets {
                table.rows.push(MappingRow {
                    probe_id: probe.id,
                    access_point_id: dc.access_point_id.clone(),
                    scenario,
                    probe_country: probe.country_code.clone(),
                    probe_continent: probe.continent,
                    connection_type: probe.connection_type,
                    dc_city: dc.city.clone(),
                    dc_country: dc.country_code.clone(),
                    dc_continent: dc.continent,
                    dc_provider: dc.provider.clone(),
                });
            }
        }

        info!(
            "mapping: {} rows for {} probes",
            table.rows.len(),
            probes.len()
        );
        table
    }

    /// A copy of the table with every `SameContinent` row refined.
    pub fn refined(&self) -> Self {
        let (rows, changed) = refine::refine_all(&self.rows);
        debug!("refined {} of {} rows", changed, rows.len());
        MappingTable {
            rows,
            skipped: self.skipped.clone(),
        }
    }

    /// Probe ids per access point, both in insertion order.
    pub fn by_target(&self) -> IndexMap<&str, Vec<u64>> {
        let mut out: IndexMap<&str, Vec<u64>> = IndexMap::new();
        for r in &self.rows {
            out.entry(r.access_point_id.as_str())
                .or_default()
                .push(r.probe_id);
        }
        out
    }

    pub fn rows_for_probe(&self, probe_id: u64) -> impl Iterator<Item = &MappingRow> {
        self.rows.iter().filter(move |r| r.probe_id == probe_id)
    }

    pub fn scenario_counts(&self) -> BTreeMap<Scenario, usize> {
        let mut out = BTreeMap::new();
        for r in &self.rows {
            *out.entry(r.scenario).or_insert(0) += 1;
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        write_rows(path, &self.rows)
    }
}

pub fn write_rows(path: &Path, rows: &[MappingRow]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for r in rows {
        w.serialize(r)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_rows(path: &Path) -> Result<Vec<MappingRow>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for r in rdr.deserialize() {
        rows.push(r?);
    }
    Ok(rows)
}
