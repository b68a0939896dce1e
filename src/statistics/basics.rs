use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::histogram_basics::HistogramBasics;
use super::StatisticsError;

// ─── Cumulative state ────────────────────────────────────────────

/// Running aggregate of every observation fed into a [`Basics`].
///
/// `min`/`max` are `None` until the first observation arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeState {
    pub count: u64,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub sum: i64,
    pub sum_square: i128,
}

impl CumulativeState {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn avg(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum as f64 / self.count as f64)
    }

    /// Sample variance over the integral sums, truncated like the sums
    /// themselves: `(Σx² − (Σx)²/n) / (n − 1)`.
    pub fn variance(&self) -> Option<f64> {
        match self.count {
            0 => None,
            1 => Some(0.0),
            n => {
                let n = n as i128;
                let sum = self.sum as i128;
                let spread = self
                    .sum_square
                    .saturating_sub(sum.saturating_mul(sum) / n);
                Some((spread / (n - 1)).max(0) as f64)
            }
        }
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Component-wise `self − baseline` for the additive fields.
    ///
    /// min/max cannot be recovered by subtraction; the result carries none.
    pub fn since(&self, baseline: &CumulativeState) -> CumulativeState {
        CumulativeState {
            count: self.count.saturating_sub(baseline.count),
            min: None,
            max: None,
            sum: self.sum.saturating_sub(baseline.sum),
            sum_square: self.sum_square.saturating_sub(baseline.sum_square),
        }
    }
}

// ─── Capability ──────────────────────────────────────────────────

/// Low-level accumulator behind every keeper.
pub trait Basics: Send {
    fn add_value(&mut self, value: i64);

    fn reset(&mut self);

    fn count(&self) -> u64;

    fn min(&self) -> Option<i64>;

    fn max(&self) -> Option<i64>;

    fn sum(&self) -> i64;

    fn sum_square(&self) -> i128;

    fn state(&self) -> CumulativeState {
        CumulativeState {
            count: self.count(),
            min: self.min(),
            max: self.max(),
            sum: self.sum(),
            sum_square: self.sum_square(),
        }
    }
}

/// Which [`Basics`] implementation a keeper is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicsKind {
    /// Plain running fields.
    #[default]
    Direct,
    /// min/max delegated to an HdrHistogram distribution.
    Histogram,
}

impl BasicsKind {
    pub const ALL: [BasicsKind; 2] = [BasicsKind::Direct, BasicsKind::Histogram];

    pub fn as_str(&self) -> &'static str {
        match self {
            BasicsKind::Direct => "direct",
            BasicsKind::Histogram => "histogram",
        }
    }

    pub fn build(&self) -> Result<Box<dyn Basics>, StatisticsError> {
        match self {
            BasicsKind::Direct => Ok(Box::new(DirectBasics::default())),
            BasicsKind::Histogram => Ok(Box::new(HistogramBasics::new()?)),
        }
    }
}

impl fmt::Display for BasicsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BasicsKind {
    type Err = StatisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "classic" => Ok(BasicsKind::Direct),
            "histogram" | "hdr" => Ok(BasicsKind::Histogram),
            _ => Err(StatisticsError::UnknownBasics(s.to_string())),
        }
    }
}

// ─── Direct variant ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DirectBasics {
    state: CumulativeState,
}

impl Basics for DirectBasics {
    fn add_value(&mut self, value: i64) {
        let s = &mut self.state;
        s.count += 1;
        s.min = Some(s.min.map_or(value, |m| m.min(value)));
        s.max = Some(s.max.map_or(value, |m| m.max(value)));
        s.sum = s.sum.saturating_add(value);
        s.sum_square = s
            .sum_square
            .saturating_add((value as i128) * (value as i128));
    }

    fn reset(&mut self) {
        self.state = CumulativeState::default();
    }

    fn count(&self) -> u64 {
        self.state.count
    }

    fn min(&self) -> Option<i64> {
        self.state.min
    }

    fn max(&self) -> Option<i64> {
        self.state.max
    }

    fn sum(&self) -> i64 {
        self.state.sum
    }

    fn sum_square(&self) -> i128 {
        self.state.sum_square
    }

    fn state(&self) -> CumulativeState {
        self.state
    }
}
