use crate::{
    config::{Batching, Measurement},
    datacenter::{Datacenter, DatacenterCatalog},
    error::{PlanError, Result},
    mapping::MappingTable,
    util::slug,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Upper bound on probes per measurement request.
pub const MAX_BATCH_SIZE: usize = 1000;

/// One submittable unit: a contiguous slice of the probes mapped to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobBatch {
    pub target: String,
    pub probe_ids: Vec<u64>,
    pub description: String,
    /// 0-based.
    pub sequence_index: usize,
    pub total_batches: usize,
}

/// Labels used to derive batch descriptions and request tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLabel {
    pub access_point_id: String,
    pub name: String,
    pub continent: String,
    pub provider: String,
}

impl TargetLabel {
    pub fn from_datacenter(dc: &Datacenter, naming: &Batching) -> Self {
        let provider = naming
            .provider_aliases
            .get(&dc.provider)
            .cloned()
            .unwrap_or_else(|| dc.provider.clone());
        Self {
            access_point_id: dc.access_point_id.clone(),
            name: slug(&dc.name),
            continent: slug(dc.continent.code()),
            provider: slug(&provider),
        }
    }

    fn unknown(access_point_id: &str) -> Self {
        Self {
            access_point_id: access_point_id.to_string(),
            name: slug(access_point_id),
            continent: "unknown".into(),
            provider: "unknown".into(),
        }
    }
}

pub fn describe(prefix: &str, label: &TargetLabel, index: usize, total: usize) -> String {
    format!(
        "{}-{}-{}-{}of{}",
        prefix,
        label.name,
        label.provider,
        index + 1,
        total
    )
}

/// Splits `probe_ids` into `ceil(len / max_batch_size)` contiguous batches,
/// preserving order.
pub fn batch(
    label: &TargetLabel,
    probe_ids: &[u64],
    max_batch_size: usize,
    prefix: &str,
) -> Result<Vec<JobBatch>> {
    if max_batch_size == 0 || max_batch_size > MAX_BATCH_SIZE {
        return Err(PlanError::InvalidBatchSize {
            size: max_batch_size,
            max: MAX_BATCH_SIZE,
        });
    }
    let total = probe_ids.len().div_ceil(max_batch_size);
    let mut out = Vec::with_capacity(total);

    for (i, part) in probe_ids.chunks(max_batch_size).enumerate() {
        if part.len() > max_batch_size {
            return Err(PlanError::BatchSizeExceeded {
                target: label.access_point_id.clone(),
                len: part.len(),
                max: max_batch_size,
            });
        }
        out.push(JobBatch {
            target: label.access_point_id.clone(),
            probe_ids: part.to_vec(),
            description: describe(prefix, label, i, total),
            sequence_index: i,
            total_batches: total,
        });
    }
    Ok(out)
}

/// Batches for every target of the table, targets in first-seen order.
pub fn plan_batches(
    table: &MappingTable,
    catalog: &DatacenterCatalog,
    naming: &Batching,
) -> Result<Vec<JobBatch>> {
    let mut out = Vec::new();
    for (target, probe_ids) in table.by_target() {
        let label = match catalog.get(target) {
            Some(dc) => TargetLabel::from_datacenter(dc, naming),
            None => {
                warn!("target {} not in datacenter catalog; using bare labels", target);
                TargetLabel::unknown(target)
            }
        };
        out.extend(batch(
            &label,
            &probe_ids,
            naming.max_batch_size,
            &naming.description_prefix,
        )?);
    }
    info!("planned {} batches", out.len());
    Ok(out)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingDefinition {
    pub target: String,
    pub af: u8,
    pub packets: u32,
    pub size: u32,
    pub description: String,
    pub interval: u64,
    pub tags: Vec<String>,
    pub resolve_on_probe: bool,
    pub skip_dns_check: bool,
    pub include_probe_id: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSelection {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub requested: usize,
}

/// Body of one measurement-creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRequest {
    pub definitions: Vec<PingDefinition>,
    pub probes: Vec<ProbeSelection>,
    pub is_oneoff: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<i64>,
}

impl MeasurementRequest {
    pub fn for_batch(b: &JobBatch, label: &TargetLabel, m: &Measurement) -> Self {
        let mut tags = m.tags.clone();
        tags.extend([
            label.name.clone(),
            label.continent.clone(),
            label.provider.clone(),
        ]);
        let value = b
            .probe_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Self {
            definitions: vec![PingDefinition {
                target: b.target.clone(),
                af: m.af,
                packets: m.packets,
                size: m.size,
                description: b.description.clone(),
                interval: m.interval,
                tags,
                resolve_on_probe: m.resolve_on_probe,
                skip_dns_check: m.skip_dns_check,
                include_probe_id: m.include_probe_id,
                kind: "ping".into(),
            }],
            probes: vec![ProbeSelection {
                value,
                kind: "probes".into(),
                requested: b.probe_ids.len(),
            }],
            is_oneoff: m.is_oneoff,
            bill_to: m.bill_to.clone(),
            start_time: m.start_time,
            stop_time: m.stop_time,
        }
    }
}

/// Request bodies for `batches`, labelled from the catalog.
pub fn requests(
    batches: &[JobBatch],
    catalog: &DatacenterCatalog,
    naming: &Batching,
    m: &Measurement,
) -> Vec<MeasurementRequest> {
    batches
        .iter()
        .map(|b| {
            let label = catalog
                .get(&b.target)
                .map(|dc| TargetLabel::from_datacenter(dc, naming))
                .unwrap_or_else(|| TargetLabel::unknown(&b.target));
            MeasurementRequest::for_batch(b, &label, m)
        })
        .collect()
}
