use crate::{
    catalog::ConnectionType,
    error::SkipReason,
    selector::Scenario,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one planning run. Non-fatal conditions are only reported here,
/// grouped by reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanReport {
    pub raw_probes: usize,
    pub classified: BTreeMap<ConnectionType, usize>,
    pub ethernet_baselines: usize,
    pub planned_probes: usize,
    pub mapping_rows: usize,
    pub scenarios: BTreeMap<Scenario, usize>,
    pub targets: usize,
    pub batches: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl PlanReport {
    pub fn record_skips<'a, I>(&mut self, skips: I)
    where
        I: IntoIterator<Item = &'a (u64, SkipReason)>,
    {
        for (_, reason) in skips {
            *self.skipped.entry(*reason).or_insert(0) += 1;
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}
