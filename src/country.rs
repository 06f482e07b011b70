use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Continent {
    AF,
    AN,
    AS,
    EU,
    NA,
    OC,
    SA,
}

impl Continent {
    pub fn code(self) -> &'static str {
        match self {
            Continent::AF => "AF",
            Continent::AN => "AN",
            Continent::AS => "AS",
            Continent::EU => "EU",
            Continent::NA => "NA",
            Continent::OC => "OC",
            Continent::SA => "SA",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "AF" => Some(Continent::AF),
            "AN" => Some(Continent::AN),
            "AS" => Some(Continent::AS),
            "EU" => Some(Continent::EU),
            "NA" => Some(Continent::NA),
            "OC" => Some(Continent::OC),
            "SA" => Some(Continent::SA),
            _ => None,
        }
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

use Continent::{AF, AN, AS, EU, NA, OC, SA};

// ISO 3166-1 alpha-2 (plus a few de-facto codes seen in probe metadata).
#[rustfmt::skip]
const COUNTRY_CONTINENT: &[(&str, Continent)] = &[
    ("AB", AS), ("AD", EU), ("AE", AS), ("AF", AS), ("AG", NA), ("AI", NA), ("AL", EU), ("AM", AS),
    ("AO", AF), ("AR", SA), ("AS", OC), ("AT", EU), ("AU", OC), ("AW", NA), ("AX", EU), ("AZ", AS),
    ("BA", EU), ("BB", NA), ("BD", AS), ("BE", EU), ("BF", AF), ("BG", EU), ("BH", AS), ("BI", AF),
    ("BJ", AF), ("BL", NA), ("BM", NA), ("BN", AS), ("BO", SA), ("BQ", NA), ("BR", SA), ("BS", NA),
    ("BT", AS), ("BV", AN), ("BW", AF), ("BY", EU), ("BZ", NA), ("CA", NA), ("CC", AS), ("CD", AF),
    ("CF", AF), ("CG", AF), ("CH", EU), ("CI", AF), ("CK", OC), ("CL", SA), ("CM", AF), ("CN", AS),
    ("CO", SA), ("CR", NA), ("CU", NA), ("CV", AF), ("CW", NA), ("CX", AS), ("CY", AS), ("CZ", EU),
    ("DE", EU), ("DJ", AF), ("DK", EU), ("DM", NA), ("DO", NA), ("DZ", AF), ("EC", SA), ("EE", EU),
    ("EG", AF), ("ER", AF), ("ES", EU), ("ET", AF), ("FI", EU), ("FJ", OC), ("FK", SA), ("FM", OC),
    ("FO", EU), ("FR", EU), ("GA", AF), ("GB", EU), ("GD", NA), ("GE", AS), ("GF", SA), ("GG", EU),
    ("GH", AF), ("GI", EU), ("GL", NA), ("GM", AF), ("GN", AF), ("GP", NA), ("GQ", AF), ("GR", EU),
    ("GS", SA), ("GT", NA), ("GU", OC), ("GW", AF), ("GY", SA), ("HK", AS), ("HM", AN), ("HN", NA),
    ("HR", EU), ("HT", NA), ("HU", EU), ("ID", AS), ("IE", EU), ("IL", AS), ("IM", EU), ("IN", AS),
    ("IO", AS), ("IQ", AS), ("IR", AS), ("IS", EU), ("IT", EU), ("JE", EU), ("JM", NA), ("JO", AS),
    ("JP", AS), ("KE", AF), ("KG", AS), ("KH", AS), ("KI", OC), ("KM", AF), ("KN", NA), ("KP", AS),
    ("KR", AS), ("KW", AS), ("KY", NA), ("KZ", AS), ("LA", AS), ("LB", AS), ("LC", NA), ("LI", EU),
    ("LK", AS), ("LR", AF), ("LS", AF), ("LT", EU), ("LU", EU), ("LV", EU), ("LY", AF), ("MA", AF),
    ("MC", EU), ("MD", EU), ("ME", EU), ("MF", NA), ("MG", AF), ("MH", OC), ("MK", EU), ("ML", AF),
    ("MM", AS), ("MN", AS), ("MO", AS), ("MP", OC), ("MQ", NA), ("MR", AF), ("MS", NA), ("MT", EU),
    ("MU", AF), ("MV", AS), ("MW", AF), ("MX", NA), ("MY", AS), ("MZ", AF), ("NA", AF), ("NC", OC),
    ("NE", AF), ("NF", OC), ("NG", AF), ("NI", NA), ("NL", EU), ("NO", EU), ("NP", AS), ("NR", OC),
    ("NU", OC), ("NZ", OC), ("OM", AS), ("OS", AS), ("PA", NA), ("PE", SA), ("PF", OC), ("PG", OC),
    ("PH", AS), ("PK", AS), ("PL", EU), ("PM", NA), ("PR", NA), ("PS", AS), ("PT", EU), ("PW", OC),
    ("PY", SA), ("QA", AS), ("RE", AF), ("RO", EU), ("RS", EU), ("RU", EU), ("RW", AF), ("SA", AS),
    ("SB", OC), ("SC", AF), ("SD", AF), ("SE", EU), ("SG", AS), ("SH", AF), ("SI", EU), ("SJ", EU),
    ("SK", EU), ("SL", AF), ("SM", EU), ("SN", AF), ("SO", AF), ("SR", SA), ("SS", AF), ("ST", AF),
    ("SV", NA), ("SY", AS), ("SZ", AF), ("TC", NA), ("TD", AF), ("TG", AF), ("TH", AS), ("TJ", AS),
    ("TK", OC), ("TM", AS), ("TN", AF), ("TO", OC), ("TP", AS), ("TR", AS), ("TT", NA), ("TV", OC),
    ("TW", AS), ("TZ", AF), ("UA", EU), ("UG", AF), ("US", NA), ("UY", SA), ("UZ", AS), ("VC", NA),
    ("VE", SA), ("VG", NA), ("VI", NA), ("VN", AS), ("VU", OC), ("WF", OC), ("WS", OC), ("XK", EU),
    ("YE", AS), ("YT", AF), ("ZA", AF), ("ZM", AF), ("ZW", AF),
];

/// Neighbor sets, keyed by datacenter-hosting country. Directional: only the
/// keys listed here have neighbors, and `B in NEIGHBORS[A]` says nothing
/// about `A in NEIGHBORS[B]`.
#[rustfmt::skip]
const NEIGHBORS: &[(&str, &[&str])] = &[
    ("DE", &["FR", "CH", "BE", "NL", "IT", "AT", "CZ", "PL", "DM"]),
    ("GB", &["FR", "BE", "NL", "IE"]),
    ("HK", &["CN", "MO", "TW", "VN", "PH"]),
    ("SG", &["MY", "ID", "VN"]),
    ("JP", &["KR", "CN", "TW", "RU", "KP", "HK"]),
    ("KR", &["JP", "CN", "TW", "RU", "KP", "HK"]),
    ("IN", &["CN", "PK", "AF", "BD", "BT", "NP", "KH", "LK"]),
    ("AU", &["ID", "TL", "PG", "SB", "NU", "VC", "NZ"]),
    ("BR", &["AR", "BO", "CO", "GY", "PY", "PE", "SR", "UY", "VE"]),
];

fn continent_table() -> &'static HashMap<&'static str, Continent> {
    static TABLE: OnceLock<HashMap<&'static str, Continent>> = OnceLock::new();
    TABLE.get_or_init(|| COUNTRY_CONTINENT.iter().copied().collect())
}

/// Continent of an ISO alpha-2 country code. Codes are matched
/// case-insensitively; an absent code is a hard failure.
pub fn continent_of(country: &str) -> Result<Continent> {
    let code = country.trim().to_ascii_uppercase();
    continent_table()
        .get(code.as_str())
        .copied()
        .ok_or_else(|| PlanError::UnknownCountry {
            code: country.to_string(),
            context: "not in country/continent table".into(),
        })
}

/// True when `b` is in the curated neighbor set of `a`.
pub fn is_neighbor(a: &str, b: &str) -> bool {
    NEIGHBORS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(a.trim()))
        .is_some_and(|(_, set)| set.iter().any(|c| c.eq_ignore_ascii_case(b.trim())))
}
