use thiserror::Error;

/// Misuse of a keeper or invalid construction parameters.
///
/// Empty aggregates are never errors; they surface as `None` values.
#[derive(Debug, Clone, Error, PartialEq)]
#[non_exhaustive]
pub enum StatisticsError {
    #[error("at least one bucket boundary is required")]
    NoBoundaries,

    #[error("bucket boundaries must be strictly ascending, got {0:?}")]
    NonAscendingBoundaries(Vec<i64>),

    #[error("percentile {0} is outside 0..=100")]
    InvalidPercentile(f64),

    #[error("percentile {0} is listed more than once")]
    DuplicatePercentile(f64),

    #[error("unknown basics variant '{0}'")]
    UnknownBasics(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("item index {index} out of range (schema has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown item '{0}'")]
    UnknownItem(String),

    #[error("non-finite observation {0}")]
    NonFiniteValue(f64),

    #[error("histogram: {0}")]
    Histogram(String),

    #[error("cannot register metric '{name}': {reason}")]
    Registration { name: String, reason: String },
}
