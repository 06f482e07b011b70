use crate::{batch::MAX_BATCH_SIZE, catalog::ConnectionType};
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub proximity: Proximity,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub batching: Batching,
    #[serde(default)]
    pub measurement: Measurement,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let size = self.batching.max_batch_size;
        if size == 0 || size > MAX_BATCH_SIZE {
            return Err(anyhow!(
                "batching.max_batch_size must be between 1 and {MAX_BATCH_SIZE}, got {size}"
            ));
        }
        if self.proximity.workers == 0 {
            return Err(anyhow!("proximity.workers must be at least 1"));
        }
        let priority = &self.classification.priority;
        if priority.is_empty() {
            return Err(anyhow!("classification.priority must not be empty"));
        }
        for (i, ct) in priority.iter().enumerate() {
            if priority[..i].contains(ct) {
                return Err(anyhow!("classification.priority lists {ct} twice"));
            }
        }
        Ok(())
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub run_name: String,
    pub resume: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            run_name: "default".into(),
            resume: false,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub out_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
        }
    }
}

/// Tag predicate for one connection type: every `required` tag present, at
/// least one `included` tag present, no `excluded` tag present. An empty
/// `included` list matches no probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagFilter {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub included: Vec<String>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub required_status: String,
    pub excluded_tags: Vec<String>,
    pub satellite_tags: Vec<String>,
    pub satellite_asns: Vec<u32>,
    pub wifi: TagFilter,
    pub cellular: TagFilter,
    pub ethernet: TagFilter,
    /// First matching type wins when a probe satisfies several predicates.
    pub priority: Vec<ConnectionType>,
    pub drop_unmatched: bool,
}
impl Default for Classification {
    fn default() -> Self {
        Self {
            required_status: "Connected".into(),
            excluded_tags: vec![
                "system-anchor".into(),
                "system-virtual".into(),
                "datacentre".into(),
                "vpn-tunnelled".into(),
            ],
            satellite_tags: vec!["starlink".into()],
            satellite_asns: vec![14593],
            wifi: TagFilter {
                required: vec!["system-ipv4-works".into()],
                included: vec!["wifi".into(), "wlan".into(), "wi-fi".into()],
                excluded: vec!["lte".into(), "cellular".into(), "starlink".into()],
            },
            cellular: TagFilter {
                required: vec!["system-ipv4-works".into()],
                included: vec!["lte".into(), "cellular".into(), "5g".into(), "4g".into()],
                excluded: vec!["wifi".into(), "wlan".into(), "starlink".into()],
            },
            ethernet: TagFilter {
                required: vec!["system-ipv4-works".into()],
                included: vec!["ethernet".into(), "fibre".into(), "dsl".into(), "cable".into()],
                excluded: vec![
                    "wifi".into(),
                    "wlan".into(),
                    "lte".into(),
                    "cellular".into(),
                    "starlink".into(),
                ],
            },
            priority: vec![
                ConnectionType::Satellite,
                ConnectionType::Wifi,
                ConnectionType::Cellular,
                ConnectionType::Ethernet,
            ],
            drop_unmatched: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proximity {
    /// When false, every classified ethernet probe is kept instead of only the
    /// nearest-match baselines.
    pub enabled: bool,
    pub workers: usize,
}
impl Default for Proximity {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Selection {
    /// Target every datacenter of a multi-provider group instead of only the
    /// first one in catalog order. Off, a probe keeps two to four targets.
    pub provider_fanout: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batching {
    pub max_batch_size: usize,
    pub description_prefix: String,
    pub provider_aliases: BTreeMap<String, String>,
}
impl Default for Batching {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            description_prefix: "Ping".into(),
            provider_aliases: BTreeMap::from([("Amazon EC2".to_string(), "Amazon".to_string())]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub af: u8,
    pub packets: u32,
    pub size: u32,
    pub interval: u64,
    pub tags: Vec<String>,
    pub resolve_on_probe: bool,
    pub skip_dns_check: bool,
    pub include_probe_id: bool,
    pub is_oneoff: bool,
    #[serde(default)]
    pub bill_to: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub stop_time: Option<i64>,
}
impl Default for Measurement {
    fn default() -> Self {
        Self {
            af: 4,
            packets: 3,
            size: 48,
            interval: 14400,
            tags: vec!["ping".into(), "thousand".into()],
            resolve_on_probe: false,
            skip_dns_check: false,
            include_probe_id: false,
            is_oneoff: false,
            bill_to: None,
            start_time: None,
            stop_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_mapping_csv: bool,
    pub write_jobs_json: bool,
    pub write_report_json: bool,
    pub write_index_json: bool,
    pub mapping_filename: String,
    pub jobs_filename: String,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_mapping_csv: true,
            write_jobs_json: true,
            write_report_json: true,
            write_index_json: true,
            mapping_filename: "mapping.csv".into(),
            jobs_filename: "jobs.json".into(),
            report_filename: "report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: true,
        }
    }
}
