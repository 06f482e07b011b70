use crate::{country, mapping::MappingRow, selector::Scenario};

/// Narrows a coarse `SameContinent` label once both countries are known.
///
/// Same country wins over adjacency; adjacency is looked up from the
/// datacenter's country towards the probe's. Any other scenario passes
/// through unchanged, so applying this twice is the same as applying it once.
pub fn refine_scenario(scenario: Scenario, probe_country: &str, dc_country: &str) -> Scenario {
    if scenario != Scenario::SameContinent {
        return scenario;
    }
    if probe_country.eq_ignore_ascii_case(dc_country) {
        Scenario::SameCountry
    } else if country::is_neighbor(dc_country, probe_country) {
        Scenario::NeighborCountry
    } else {
        Scenario::SameContinent
    }
}

pub fn refine(row: &MappingRow) -> Scenario {
    refine_scenario(row.scenario, &row.probe_country, &row.dc_country)
}

/// Returns new rows with every scenario refined, and how many changed.
pub fn refine_all(rows: &[MappingRow]) -> (Vec<MappingRow>, usize) {
    let mut changed = 0;
    let out = rows
        .iter()
        .map(|r| {
            let scenario = refine(r);
            if scenario != r.scenario {
                changed += 1;
            }
            MappingRow {
                scenario,
                ..r.clone()
            }
        })
        .collect();
    (out, changed)
}
