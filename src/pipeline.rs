use crate::{
    batch::{self, JobBatch, MeasurementRequest},
    catalog::{self, ClassifiedProbes, ConnectionType, Probe, RawProbe},
    config::Config,
    datacenter::DatacenterCatalog,
    error::{Result, SkipReason},
    mapping::MappingTable,
    proximity::{self, ProximityMatch},
    report::PlanReport,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Planner<'a> {
    cfg: Config,
    catalog: &'a DatacenterCatalog,
}

pub struct PlanOutput {
    pub probes: Vec<Probe>,
    pub matches: Vec<ProximityMatch>,
    pub mapping: MappingTable,
    pub batches: Vec<JobBatch>,
    pub requests: Vec<MeasurementRequest>,
    pub report: PlanReport,
}

impl<'a> Planner<'a> {
    pub fn new(cfg: &Config, catalog: &'a DatacenterCatalog) -> Self {
        Self {
            cfg: cfg.clone(),
            catalog,
        }
    }

    /// Classification plus ethernet baselines: the probe set the mapping
    /// runs over.
    pub fn select_probes(
        &self,
        classified: &ClassifiedProbes,
    ) -> Result<(Vec<Probe>, Vec<ProximityMatch>, Vec<(u64, SkipReason)>)> {
        let mut skipped = Vec::new();
        let non_ethernet: Vec<Probe> = classified
            .probes
            .iter()
            .filter(|p| p.connection_type != ConnectionType::Ethernet)
            .cloned()
            .collect();
        let ethernet: Vec<Probe> = classified.of_type(ConnectionType::Ethernet).cloned().collect();

        if !self.cfg.proximity.enabled {
            let mut all = non_ethernet;
            all.extend(ethernet);
            return Ok((all, Vec::new(), skipped));
        }

        let targets: Vec<Probe> = non_ethernet
            .iter()
            .filter(|p| {
                matches!(
                    p.connection_type,
                    ConnectionType::Wifi | ConnectionType::Cellular
                )
            })
            .cloned()
            .collect();
        if ethernet.is_empty() && !targets.is_empty() {
            warn!("no ethernet probes classified; wifi/cellular probes get no baseline");
        }

        let matches = proximity::nearest_ethernet_match_parallel(
            &targets,
            &ethernet,
            self.cfg.proximity.workers,
        )?;

        let matched: HashSet<u64> = matches.iter().map(|m| m.probe_id).collect();
        for t in &targets {
            if !matched.contains(&t.id) {
                skipped.push((t.id, SkipReason::NoEthernetCandidate));
            }
        }

        // A baseline shared by several targets is measured once.
        let by_id: HashMap<u64, &Probe> = ethernet.iter().map(|p| (p.id, p)).collect();
        let mut baseline_ids = HashSet::new();
        let mut probes = non_ethernet;
        for m in &matches {
            debug!(
                "probe {} -> ethernet {} ({:.1} km)",
                m.probe_id, m.ethernet_id, m.distance_km
            );
            if baseline_ids.insert(m.ethernet_id)
                && let Some(p) = by_id.get(&m.ethernet_id)
            {
                probes.push((*p).clone());
            }
        }

        Ok((probes, matches, skipped))
    }

    pub fn run(&self, raw: &[RawProbe]) -> Result<PlanOutput> {
        let started = Instant::now();

        let classified = catalog::classify(raw, &self.cfg.classification)?;
        let (probes, matches, proximity_skips) = self.select_probes(&classified)?;

        let mapping = MappingTable::build(
            &probes,
            self.catalog,
            self.cfg.selection.provider_fanout,
        )
        .refined();
        let batches = batch::plan_batches(&mapping, self.catalog, &self.cfg.batching)?;
        let requests = batch::requests(
            &batches,
            self.catalog,
            &self.cfg.batching,
            &self.cfg.measurement,
        );

        let mut report = PlanReport {
            raw_probes: raw.len(),
            ethernet_baselines: probes
                .iter()
                .filter(|p| p.connection_type == ConnectionType::Ethernet)
                .count(),
            planned_probes: probes.len(),
            mapping_rows: mapping.rows.len(),
            scenarios: mapping.scenario_counts(),
            targets: mapping.by_target().len(),
            batches: batches.len(),
            ..Default::default()
        };
        for p in &classified.probes {
            *report.classified.entry(p.connection_type).or_insert(0) += 1;
        }
        report.record_skips(&classified.skipped);
        report.record_skips(&proximity_skips);
        report.record_skips(&mapping.skipped);

        info!(
            "plan: {} probes -> {} rows, {} targets, {} batches, {} skipped ({} ms)",
            report.planned_probes,
            report.mapping_rows,
            report.targets,
            report.batches,
            report.skipped_total(),
            started.elapsed().as_millis()
        );

        Ok(PlanOutput {
            probes,
            matches,
            mapping,
            batches,
            requests,
            report,
        })
    }
}
