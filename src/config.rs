use serde::{Deserialize, Serialize};

use crate::statistics::percentiles::{
    validate_boundaries, validate_percentiles, DEFAULT_BOUNDARIES, DEFAULT_PERCENTILES,
};
use crate::statistics::{BasicsKind, StatisticsError};

/// Tunables for statistics keepers, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Accumulator implementation behind each keeper
    #[serde(default)]
    pub basics: BasicsKind,

    /// Threshold boundaries, strictly ascending, in the unit of observations
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<i64>,

    /// Suffix appended to boundaries in display keys (`100ms`)
    #[serde(default = "default_unit")]
    pub unit: String,

    /// Percentiles exposed as `p<N>` items
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,

    /// How often the scheduler closes the interval window (seconds)
    #[serde(default = "default_mark_interval_secs")]
    pub mark_interval_secs: u64,

    /// Default cap on messages returned by a message-browsing filter
    /// (0 = unlimited). Carried for embedding applications; keepers never
    /// read it.
    #[serde(default)]
    pub browse_messages_max: usize,
}

fn default_boundaries() -> Vec<i64> {
    DEFAULT_BOUNDARIES.to_vec()
}
fn default_unit() -> String {
    "ms".into()
}
fn default_percentiles() -> Vec<f64> {
    DEFAULT_PERCENTILES.to_vec()
}
fn default_mark_interval_secs() -> u64 {
    3600
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            basics: BasicsKind::default(),
            boundaries: default_boundaries(),
            unit: default_unit(),
            percentiles: default_percentiles(),
            mark_interval_secs: default_mark_interval_secs(),
            browse_messages_max: 0,
        }
    }
}

impl StatisticsConfig {
    pub fn with_basics(basics: BasicsKind) -> Self {
        Self {
            basics,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), StatisticsError> {
        validate_boundaries(&self.boundaries)?;
        validate_percentiles(&self.percentiles)
    }

    /// Display key of a boundary, e.g. `1000ms`.
    pub fn threshold_name(&self, boundary: i64) -> String {
        format!("{boundary}{}", self.unit)
    }
}
