//! Continent-keyed datacenter selection.
//!
//! The table below is the study's fixed vantage geography: every probe gets
//! two to four target slots, each labelled with a coarse locality scenario.
//! A slot names a datacenter group and resolves to its first datacenter, or
//! to all of them when provider fan-out is on.

use crate::{
    catalog::Probe,
    country::Continent,
    datacenter::{Datacenter, DatacenterCatalog, DcGroup},
    error::SkipReason,
    geo::LatLon,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic relationship between a probe and a datacenter, ordered by
/// increasing distance. `SameContinent` is the coarse label the refiner
/// narrows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scenario {
    SameCountry,
    NeighborCountry,
    SameContinent,
    NeighborContinent,
    OtherContinent,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::SameCountry,
        Scenario::NeighborCountry,
        Scenario::SameContinent,
        Scenario::NeighborContinent,
        Scenario::OtherContinent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::SameCountry => "SameCountry",
            Scenario::NeighborCountry => "NeighborCountry",
            Scenario::SameContinent => "SameContinent",
            Scenario::NeighborContinent => "NeighborContinent",
            Scenario::OtherContinent => "OtherContinent",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Group(DcGroup),
    /// Asian datacenters hosted in the given country.
    HostCountry(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub target: Target,
    pub scenario: Scenario,
}

fn slot(g: DcGroup, scenario: Scenario) -> Slot {
    Slot {
        target: Target::Group(g),
        scenario,
    }
}

/// Target slots for a probe at `location` in `country` / `continent`.
/// Returns an empty list for continents without a branch.
pub fn plan_slots(
    continent: Continent,
    country: &str,
    location: LatLon,
    catalog: &DatacenterCatalog,
) -> Vec<Slot> {
    use DcGroup::*;
    use Scenario::*;

    let nearest_us = || catalog.nearest_group(location, &[UsEast, UsWest]);

    match continent {
        Continent::EU => vec![
            slot(Frankfurt, SameContinent),
            slot(London, SameContinent),
            slot(UsEast, NeighborContinent),
            slot(HongKong, OtherContinent),
        ],
        Continent::AS => {
            let mut slots = if country == "HK" || country == "SG" {
                vec![slot(HongKong, SameContinent), slot(Singapore, SameContinent)]
            } else if !catalog.asia_in_country(country).is_empty() {
                vec![
                    Slot {
                        target: Target::HostCountry(country.to_string()),
                        scenario: SameCountry,
                    },
                    slot(HongKong, NeighborCountry),
                ]
            } else {
                vec![slot(HongKong, SameContinent), slot(Singapore, SameContinent)]
            };
            slots.push(slot(UsEast, NeighborContinent));
            slots.push(slot(Frankfurt, OtherContinent));
            slots
        }
        Continent::NA => {
            let mut slots = match country {
                "US" => {
                    let mut s = Vec::new();
                    if let Some(us) = nearest_us() {
                        s.push(slot(us, SameCountry));
                    }
                    s.push(slot(Canada, NeighborCountry));
                    s
                }
                "CA" => {
                    let mut s = vec![slot(Canada, SameCountry)];
                    if let Some(us) = nearest_us() {
                        s.push(slot(us, NeighborCountry));
                    }
                    s
                }
                _ => vec![slot(UsEast, SameCountry), slot(UsWest, NeighborCountry)],
            };
            slots.push(slot(SouthAmerica, NeighborContinent));
            slots.push(slot(Frankfurt, NeighborContinent));
            slots
        }
        Continent::SA => vec![
            slot(SouthAmerica, SameContinent),
            slot(UsEast, NeighborContinent),
            slot(Frankfurt, OtherContinent),
            slot(HongKong, OtherContinent),
        ],
        Continent::OC => vec![
            slot(Oceania, SameContinent),
            slot(UsEast, NeighborContinent),
            slot(Frankfurt, OtherContinent),
            slot(HongKong, NeighborContinent),
        ],
        Continent::AF => vec![
            slot(Frankfurt, NeighborContinent),
            slot(Mumbai, OtherContinent),
            slot(UsEast, OtherContinent),
            slot(HongKong, OtherContinent),
        ],
        Continent::AN => Vec::new(),
    }
}

/// Datacenters a slot resolves to, in catalog order.
pub fn resolve<'a>(slot: &Slot, catalog: &'a DatacenterCatalog) -> Vec<&'a Datacenter> {
    match &slot.target {
        Target::Group(g) => catalog.group(*g).collect(),
        Target::HostCountry(c) => catalog.asia_in_country(c),
    }
}

/// Outcome of selecting datacenters for one probe.
#[derive(Debug, Clone, Default)]
pub struct Picks<'a> {
    pub targets: Vec<(&'a Datacenter, Scenario)>,
    /// Why slots produced nothing, each reason at most once.
    pub dropped: Vec<SkipReason>,
}

impl Picks<'_> {
    fn drop_for(&mut self, reason: SkipReason) {
        if !self.dropped.contains(&reason) {
            self.dropped.push(reason);
        }
    }
}

/// Runs the slot table for one probe. Without `provider_fanout` a slot
/// contributes the first datacenter of its group. An access point reached by
/// two slots keeps the first.
pub fn pick<'a>(
    probe: &Probe,
    catalog: &'a DatacenterCatalog,
    provider_fanout: bool,
) -> Picks<'a> {
    let mut out = Picks::default();
    let slots = plan_slots(probe.continent, &probe.country_code, probe.location, catalog);
    if slots.is_empty() {
        out.drop_for(SkipReason::NoSelectorBranch);
        return out;
    }

    for s in &slots {
        let mut dcs = resolve(s, catalog);
        if dcs.is_empty() {
            out.drop_for(SkipReason::EmptyDatacenterGroup);
            continue;
        }
        if !provider_fanout {
            dcs.truncate(1);
        }
        for dc in dcs {
            if out
                .targets
                .iter()
                .any(|(d, _)| d.access_point_id == dc.access_point_id)
            {
                out.drop_for(SkipReason::DuplicatePair);
                continue;
            }
            out.targets.push((dc, s.scenario));
        }
    }
    out
}

/// Datacenters a probe should measure against, each with its coarse
/// scenario: one per slot, two to four in total.
pub fn select_datacenters<'a>(
    probe: &Probe,
    catalog: &'a DatacenterCatalog,
) -> Vec<(&'a Datacenter, Scenario)> {
    pick(probe, catalog, false).targets
}
