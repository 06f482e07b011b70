mod common;

use atlas_plan::{
    catalog::{self, ConnectionType, RawProbe},
    config::Config,
    error::{PlanError, SkipReason},
    mapping::{self, MappingTable},
    pipeline::Planner,
    selector::Scenario,
};
use std::collections::HashSet;

fn fixture_probes() -> Vec<RawProbe> {
    catalog::load_probes(&common::fixture("probes.json")).unwrap()
}

#[test]
fn fixture_plan() {
    let cfg = Config::default();
    let dcs = common::datacenters();
    let out = Planner::new(&cfg, &dcs).run(&fixture_probes()).unwrap();

    // Baselines follow target order; 1013 is nobody's nearest ethernet probe.
    let ids: Vec<u64> = out.probes.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1001, 1004, 1006, 1010, 1011, 1002, 1005, 1003, 1012]);
    assert_eq!(out.matches.len(), 4);
    assert_eq!(out.report.ethernet_baselines, 4);

    assert_eq!(out.mapping.rows.len(), 32);
    assert_eq!(out.report.skipped.get(&SkipReason::NoSelectorBranch), Some(&1));
    assert_eq!(out.report.skipped.get(&SkipReason::Inactive), Some(&1));
    assert_eq!(out.report.skipped.get(&SkipReason::ExcludedTag), Some(&1));
    assert_eq!(out.report.skipped.get(&SkipReason::Unclassified), Some(&1));
    assert_eq!(out.report.scenarios.get(&Scenario::SameCountry), Some(&7));

    let pairs: HashSet<_> = out
        .mapping
        .rows
        .iter()
        .map(|r| (r.probe_id, r.access_point_id.as_str()))
        .collect();
    assert_eq!(pairs.len(), out.mapping.rows.len());

    assert_eq!(out.report.targets, 8);
    assert_eq!(out.batches.len(), 8);
    assert_eq!(out.requests.len(), 8);
}

#[test]
fn refined_rows_for_german_and_french_probes() {
    let cfg = Config::default();
    let dcs = common::datacenters();
    let out = Planner::new(&cfg, &dcs).run(&fixture_probes()).unwrap();

    let scen = |probe: u64, city: &str| {
        out.mapping
            .rows_for_probe(probe)
            .find(|r| r.dc_city == city)
            .map(|r| r.scenario)
    };
    assert_eq!(scen(1001, "Frankfurt am Main"), Some(Scenario::SameCountry));
    assert_eq!(scen(1001, "London"), Some(Scenario::SameContinent));
    assert_eq!(scen(1003, "Frankfurt am Main"), Some(Scenario::NeighborCountry));
    assert_eq!(scen(1003, "London"), Some(Scenario::NeighborCountry));
    assert_eq!(scen(1006, "Sydney"), Some(Scenario::SameCountry));

    let baseline = out.mapping.rows_for_probe(1002).next().unwrap();
    assert_eq!(baseline.connection_type, ConnectionType::Ethernet);
}

#[test]
fn batches_preserve_mapping_order_per_target() {
    let cfg = Config::default();
    let dcs = common::datacenters();
    let out = Planner::new(&cfg, &dcs).run(&fixture_probes()).unwrap();

    for (target, ids) in out.mapping.by_target() {
        let joined: Vec<u64> = out
            .batches
            .iter()
            .filter(|b| b.target == target)
            .flat_map(|b| b.probe_ids.clone())
            .collect();
        assert_eq!(joined, ids, "{target}");
    }
    let frankfurt = out
        .batches
        .iter()
        .find(|b| b.target == "ec2.eu-central-1.amazonaws.com")
        .unwrap();
    assert_eq!(frankfurt.description, "Ping-frankfurt-amazon-1of1");
}

#[test]
fn proximity_disabled_keeps_every_ethernet_probe() {
    let mut cfg = Config::default();
    cfg.proximity.enabled = false;
    let dcs = common::datacenters();
    let out = Planner::new(&cfg, &dcs).run(&fixture_probes()).unwrap();
    assert_eq!(out.report.ethernet_baselines, 5);
    assert!(out.matches.is_empty());
}

#[test]
fn unknown_country_aborts_before_mapping() {
    let cfg = Config::default();
    let dcs = common::datacenters();
    let mut raw = fixture_probes();
    raw[0].country_code = Some("ZZ".into());

    let err = Planner::new(&cfg, &dcs).run(&raw).err().unwrap();
    assert!(matches!(err, PlanError::UnknownCountry { .. }));
}

#[test]
fn unknown_datacenter_country_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dcs.csv");
    std::fs::write(
        &path,
        "access_point_id,City,Country,Continent,Provider,Latitude,Longitude\nx.example,Nowhere,ZZ,EU,Acme,0.0,0.0\n",
    )
    .unwrap();
    let err = atlas_plan::datacenter::DatacenterCatalog::load(&path).unwrap_err();
    assert!(matches!(err, PlanError::UnknownCountry { ref code, .. } if code == "ZZ"));
}

#[test]
fn mapping_csv_round_trip_and_refine() {
    let cfg = Config::default();
    let dcs = common::datacenters();
    let out = Planner::new(&cfg, &dcs).run(&fixture_probes()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mapping.csv");
    out.mapping.write_csv(&path).unwrap();
    let rows = mapping::read_rows(&path).unwrap();
    assert_eq!(rows, out.mapping.rows);

    // Coarse rows written by an older run are refined on re-read.
    let coarse = MappingTable::build(&out.probes, &dcs, false);
    coarse.write_csv(&path).unwrap();
    let (refined, changed) = atlas_plan::refine::refine_all(&mapping::read_rows(&path).unwrap());
    assert!(changed > 0);
    assert_eq!(refined, out.mapping.rows);
}
