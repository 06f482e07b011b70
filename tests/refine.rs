use atlas_plan::{
    catalog::ConnectionType,
    country::Continent,
    mapping::MappingRow,
    refine::{refine, refine_all, refine_scenario},
    selector::Scenario,
};

fn row(probe_country: &str, dc_country: &str, scenario: Scenario) -> MappingRow {
    MappingRow {
        probe_id: 7,
        access_point_id: format!("dc.{}", dc_country.to_ascii_lowercase()),
        scenario,
        probe_country: probe_country.into(),
        probe_continent: Continent::EU,
        connection_type: ConnectionType::Wifi,
        dc_city: "x".into(),
        dc_country: dc_country.into(),
        dc_continent: Continent::EU,
        dc_provider: "p".into(),
    }
}

#[test]
fn same_country_always_wins() {
    assert_eq!(refine(&row("DE", "DE", Scenario::SameContinent)), Scenario::SameCountry);
    assert_eq!(refine(&row("de", "DE", Scenario::SameContinent)), Scenario::SameCountry);
    // DE has FR as a neighbor, but equality is checked first.
    assert_eq!(refine(&row("FR", "FR", Scenario::SameContinent)), Scenario::SameCountry);
}

#[test]
fn neighbor_lookup_goes_from_datacenter_to_probe() {
    assert_eq!(
        refine_scenario(Scenario::SameContinent, "FR", "DE"),
        Scenario::NeighborCountry
    );
    // HK is a neighbor of JP, not the other way round.
    assert_eq!(
        refine_scenario(Scenario::SameContinent, "HK", "JP"),
        Scenario::NeighborCountry
    );
    assert_eq!(
        refine_scenario(Scenario::SameContinent, "JP", "HK"),
        Scenario::SameContinent
    );
}

#[test]
fn unrelated_countries_stay_coarse() {
    assert_eq!(refine(&row("ES", "GB", Scenario::SameContinent)), Scenario::SameContinent);
    // No neighbor set for a US datacenter.
    assert_eq!(
        refine_scenario(Scenario::SameContinent, "CA", "US"),
        Scenario::SameContinent
    );
}

#[test]
fn only_same_continent_is_touched() {
    for s in Scenario::ALL {
        if s == Scenario::SameContinent {
            continue;
        }
        assert_eq!(refine(&row("FR", "DE", s)), s);
        assert_eq!(refine(&row("DE", "DE", s)), s);
    }
}

#[test]
fn refinement_is_idempotent() {
    let rows = vec![
        row("DE", "DE", Scenario::SameContinent),
        row("FR", "GB", Scenario::SameContinent),
        row("ES", "GB", Scenario::SameContinent),
        row("AR", "BR", Scenario::SameContinent),
        row("US", "DE", Scenario::NeighborContinent),
    ];
    let (once, changed) = refine_all(&rows);
    assert_eq!(changed, 3);
    let (twice, changed_again) = refine_all(&once);
    assert_eq!(changed_again, 0);
    assert_eq!(once, twice);
    assert_eq!(
        once.iter().map(|r| r.scenario).collect::<Vec<_>>(),
        vec![
            Scenario::SameCountry,
            Scenario::NeighborCountry,
            Scenario::SameContinent,
            Scenario::NeighborCountry,
            Scenario::NeighborContinent,
        ]
    );
}
