use serde::{Deserialize, Serialize};

/// Fatal planning failures. Any of these aborts the whole run; a partial
/// mapping is never written.
#[derive(thiserror::Error, Debug)]
pub enum PlanError {
    #[error("unknown country code {code:?} ({context})")]
    UnknownCountry { code: String, context: String },
    #[error("batch for {target} holds {len} probes, limit is {max}")]
    BatchSizeExceeded {
        target: String,
        len: usize,
        max: usize,
    },
    #[error("invalid batch size {size}: must be between 1 and {max}")]
    InvalidBatchSize { size: usize, max: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// Why a probe (or a probe/datacenter pair) contributes nothing to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipReason {
    Inactive,
    ExcludedTag,
    MissingLocation,
    Unclassified,
    NoEthernetCandidate,
    NoSelectorBranch,
    EmptyDatacenterGroup,
    DuplicatePair,
}
