pub mod config;
pub use config::{ColorFormat, ConfusionConfig, Config, ExportConfig, LegendConfig, PartitionConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LegendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid range [{min}, {max}]: {reason}")]
    InvalidRange { min: f64, max: f64, reason: RangeFault },
    #[error("invalid interval count {0}: must be at least 1")]
    InvalidCount(usize),
    #[error("interval list cannot be empty")]
    EmptyIntervals,
    #[error("invalid style table: {0}")]
    InvalidStyle(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0}")]
    Other(String),
}

/// Why a `(min, max)` pair was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFault {
    /// A bound is NaN or infinite; missing data arrives here as NaN.
    NonFinite,
    /// `min >= max`.
    Inverted,
    /// The range cannot hold the requested intervals at this precision.
    TooNarrow,
    /// The bounds are so large that f64 cannot resolve one step at this precision.
    Unrepresentable,
}

impl std::fmt::Display for RangeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeFault::NonFinite => write!(f, "bounds must be finite numbers"),
            RangeFault::Inverted => write!(f, "minimum must be less than maximum"),
            RangeFault::TooNarrow => {
                write!(f, "range too narrow for the requested intervals and precision")
            }
            RangeFault::Unrepresentable => {
                write!(f, "bounds too large to resolve a step at the requested precision")
            }
        }
    }
}

impl LegendError {
    /// True for the missing-data case callers answer with null intervals.
    pub fn is_missing_bounds(&self) -> bool {
        matches!(self, LegendError::InvalidRange { reason: RangeFault::NonFinite, .. })
    }
}

pub type Result<T> = std::result::Result<T, LegendError>;
