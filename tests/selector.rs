mod common;

use atlas_plan::{
    catalog::ConnectionType,
    datacenter::{Datacenter, DatacenterCatalog, DcGroup},
    error::SkipReason,
    mapping::MappingTable,
    selector::{Scenario, Target, pick, plan_slots, select_datacenters},
};
use common::{datacenters, probe, two_provider_datacenters};
use std::collections::HashSet;

fn picks(country: &str, lat: f64, lon: f64) -> Vec<(String, Scenario)> {
    let cat = datacenters();
    let p = probe(1, country, lat, lon, ConnectionType::Wifi);
    select_datacenters(&p, &cat)
        .into_iter()
        .map(|(dc, s)| (dc.city.clone(), s))
        .collect()
}

fn pair(city: &str, s: Scenario) -> (String, Scenario) {
    (city.to_string(), s)
}

#[test]
fn europe() {
    assert_eq!(
        picks("FR", 48.85, 2.35),
        vec![
            pair("Frankfurt am Main", Scenario::SameContinent),
            pair("London", Scenario::SameContinent),
            pair("Ashburn", Scenario::NeighborContinent),
            pair("Hong Kong", Scenario::OtherContinent),
        ]
    );
}

#[test]
fn asia_host_country() {
    assert_eq!(
        picks("JP", 35.68, 139.69),
        vec![
            pair("Tokyo", Scenario::SameCountry),
            pair("Hong Kong", Scenario::NeighborCountry),
            pair("Ashburn", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::OtherContinent),
        ]
    );
}

#[test]
fn asia_hong_kong_and_singapore_probes() {
    let expected = vec![
        pair("Hong Kong", Scenario::SameContinent),
        pair("Singapore", Scenario::SameContinent),
        pair("Ashburn", Scenario::NeighborContinent),
        pair("Frankfurt am Main", Scenario::OtherContinent),
    ];
    assert_eq!(picks("HK", 22.3, 114.2), expected);
    assert_eq!(picks("SG", 1.35, 103.8), expected);
    // No datacenter in Thailand.
    assert_eq!(picks("TH", 13.75, 100.5), expected);
}

#[test]
fn north_america() {
    // New York is closer to the east-coast group.
    assert_eq!(
        picks("US", 40.71, -74.0),
        vec![
            pair("Ashburn", Scenario::SameCountry),
            pair("Montreal", Scenario::NeighborCountry),
            pair("São Paulo", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::NeighborContinent),
        ]
    );
    // Seattle is closer to the west-coast group.
    assert_eq!(picks("US", 47.6, -122.3)[0], pair("San Jose", Scenario::SameCountry));
    // Vancouver.
    assert_eq!(
        picks("CA", 49.28, -123.12),
        vec![
            pair("Montreal", Scenario::SameCountry),
            pair("San Jose", Scenario::NeighborCountry),
            pair("São Paulo", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::NeighborContinent),
        ]
    );
    assert_eq!(
        picks("MX", 19.43, -99.13),
        vec![
            pair("Ashburn", Scenario::SameCountry),
            pair("San Jose", Scenario::NeighborCountry),
            pair("São Paulo", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::NeighborContinent),
        ]
    );
}

#[test]
fn south_america_oceania_africa() {
    assert_eq!(
        picks("AR", -34.6, -58.38),
        vec![
            pair("São Paulo", Scenario::SameContinent),
            pair("Ashburn", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::OtherContinent),
            pair("Hong Kong", Scenario::OtherContinent),
        ]
    );
    assert_eq!(
        picks("NZ", -36.85, 174.76),
        vec![
            pair("Sydney", Scenario::SameContinent),
            pair("Ashburn", Scenario::NeighborContinent),
            pair("Frankfurt am Main", Scenario::OtherContinent),
            pair("Hong Kong", Scenario::NeighborContinent),
        ]
    );
    assert_eq!(
        picks("KE", -1.29, 36.82),
        vec![
            pair("Frankfurt am Main", Scenario::NeighborContinent),
            pair("Mumbai", Scenario::OtherContinent),
            pair("Ashburn", Scenario::OtherContinent),
            pair("Hong Kong", Scenario::OtherContinent),
        ]
    );
}

#[test]
fn antarctica_has_no_branch() {
    assert!(picks("BV", -54.42, 3.35).is_empty());
}

const BRANCH_CASES: [(&str, f64, f64); 10] = [
    ("DE", 52.5, 13.4),
    ("GB", 51.5, -0.1),
    ("IN", 19.0, 72.8),
    ("HK", 22.3, 114.2),
    ("CN", 39.9, 116.4),
    ("US", 34.05, -118.24),
    ("CA", 45.5, -73.6),
    ("BR", -23.5, -46.6),
    ("AU", -33.9, 151.2),
    ("ZA", -26.2, 28.0),
];

#[test]
fn every_branch_selects_two_to_four_unique_datacenters_one_per_slot() {
    for cat in [datacenters(), two_provider_datacenters()] {
        for (country, lat, lon) in BRANCH_CASES {
            let p = probe(1, country, lat, lon, ConnectionType::Ethernet);
            let sel = select_datacenters(&p, &cat);
            assert!((2..=4).contains(&sel.len()), "{country}: {}", sel.len());

            let ids: HashSet<_> = sel.iter().map(|(dc, _)| dc.access_point_id.as_str()).collect();
            assert_eq!(ids.len(), sel.len(), "{country}");

            // Labels are exactly the slot table's, one datacenter per slot.
            let slot_scenarios: Vec<Scenario> =
                plan_slots(p.continent, &p.country_code, p.location, &cat)
                    .iter()
                    .map(|s| s.scenario)
                    .collect();
            let scenarios: Vec<Scenario> = sel.iter().map(|(_, s)| *s).collect();
            assert_eq!(scenarios, slot_scenarios, "{country}");
        }
    }
}

#[test]
fn multi_provider_group_keeps_first_datacenter() {
    let cat = two_provider_datacenters();
    assert_eq!(cat.group(DcGroup::Frankfurt).count(), 2);

    let p = probe(1, "PL", 52.2, 21.0, ConnectionType::Wifi);
    let sel = select_datacenters(&p, &cat);
    assert_eq!(sel.len(), 4);
    assert!(sel.iter().all(|(dc, _)| dc.provider == "Amazon EC2"));
}

#[test]
fn provider_fanout_targets_every_provider() {
    let cat = two_provider_datacenters();
    let p = probe(1, "PL", 52.2, 21.0, ConnectionType::Wifi);

    let picks = pick(&p, &cat, true);
    assert_eq!(picks.targets.len(), 8);
    assert_eq!(
        picks
            .targets
            .iter()
            .filter(|(dc, _)| dc.city == "Frankfurt am Main")
            .count(),
        2
    );
    assert!(picks.dropped.is_empty());
}

#[test]
fn empty_slots_are_reported_once_per_probe() {
    // Neither Frankfurt nor Hong Kong: two of the four African slots are empty.
    let dcs: Vec<Datacenter> = datacenters()
        .iter()
        .filter(|d| d.country_code != "DE" && d.country_code != "HK")
        .cloned()
        .collect();
    let cat = DatacenterCatalog::new(dcs);
    let p = probe(7, "KE", -1.29, 36.82, ConnectionType::Wifi);

    let picks = pick(&p, &cat, false);
    assert_eq!(picks.targets.len(), 2);
    assert_eq!(picks.dropped, vec![SkipReason::EmptyDatacenterGroup]);

    let table = MappingTable::build(&[p], &cat, false);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.skipped, vec![(7, SkipReason::EmptyDatacenterGroup)]);
}

#[test]
fn mapping_table_uses_the_same_selection() {
    let cat = two_provider_datacenters();
    let probes: Vec<_> = BRANCH_CASES
        .iter()
        .enumerate()
        .map(|(i, (c, lat, lon))| probe(i as u64 + 1, c, *lat, *lon, ConnectionType::Wifi))
        .collect();
    let table = MappingTable::build(&probes, &cat, false);

    for p in &probes {
        let rows: Vec<(&str, Scenario)> = table
            .rows_for_probe(p.id)
            .map(|r| (r.access_point_id.as_str(), r.scenario))
            .collect();
        let expected: Vec<(&str, Scenario)> = select_datacenters(p, &cat)
            .into_iter()
            .map(|(dc, s)| (dc.access_point_id.as_str(), s))
            .collect();
        assert_eq!(rows, expected, "{}", p.country_code);
        assert!((2..=4).contains(&rows.len()));
    }
}

#[test]
fn us_probe_without_us_datacenters_keeps_remaining_slots() {
    let dcs: Vec<Datacenter> = datacenters()
        .iter()
        .filter(|d| d.country_code != "US")
        .cloned()
        .collect();
    let cat = DatacenterCatalog::new(dcs);
    let slots = plan_slots(
        atlas_plan::country::Continent::NA,
        "US",
        atlas_plan::geo::LatLon::new(40.7, -74.0),
        &cat,
    );
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].target, Target::Group(DcGroup::Canada));
}
