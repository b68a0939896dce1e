use serde::Serialize;

use super::StatisticsError;

/// Response-time thresholds used when no boundaries are configured.
pub const DEFAULT_BOUNDARIES: [i64; 4] = [100, 1_000, 2_000, 10_000];

/// Percentiles reported next to the threshold fractions.
pub const DEFAULT_PERCENTILES: [f64; 4] = [50.0, 90.0, 95.0, 98.0];

/// Number of observations strictly below `boundary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub boundary: i64,
    pub cumulative_count: u64,
}

/// Fixed-boundary histogram approximating a distribution.
///
/// Bin `i` holds values in `[boundaries[i-1], boundaries[i])`; one trailing
/// bin takes everything at or above the last boundary. Memory depends only on
/// the number of boundaries.
#[derive(Debug, Clone)]
pub struct PercentileEstimator {
    boundaries: Vec<i64>,
    bins: Vec<u64>,
}

impl PercentileEstimator {
    pub fn new(boundaries: Vec<i64>) -> Result<Self, StatisticsError> {
        validate_boundaries(&boundaries)?;
        let bins = vec![0; boundaries.len() + 1];
        Ok(Self { boundaries, bins })
    }

    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    pub fn record(&mut self, value: i64) {
        let idx = self.boundaries.partition_point(|&b| b <= value);
        self.bins[idx] += 1;
    }

    pub fn reset(&mut self) {
        self.bins.iter_mut().for_each(|n| *n = 0);
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Observations below `boundaries[idx]`, or `None` for an unknown index.
    pub fn cumulative_count(&self, idx: usize) -> Option<u64> {
        if idx >= self.boundaries.len() {
            return None;
        }
        Some(self.bins[..=idx].iter().sum())
    }

    pub fn buckets(&self) -> Vec<Bucket> {
        let mut running = 0;
        self.boundaries
            .iter()
            .zip(&self.bins)
            .map(|(&boundary, &n)| {
                running += n;
                Bucket {
                    boundary,
                    cumulative_count: running,
                }
            })
            .collect()
    }

    /// Percentage of observations below `boundaries[idx]`.
    pub fn fraction_below(&self, idx: usize) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let below = self.cumulative_count(idx)?;
        Some(100.0 * below as f64 / total as f64)
    }

    /// Estimate the `p`-th percentile (0..=100, clamped).
    ///
    /// The bin holding the target rank is assumed uniformly filled between
    /// its edges, which are narrowed to the observed `[min, max]`.
    pub fn estimate_percentile(&self, p: f64, min: Option<i64>, max: Option<i64>) -> Option<f64> {
        let total = self.total();
        let (min, max) = (min?, max?);
        if total == 0 {
            return None;
        }

        let rank = p.clamp(0.0, 100.0) / 100.0 * total as f64;
        if rank <= 0.0 {
            return Some(min as f64);
        }

        let mut below = 0u64;
        for (i, &n) in self.bins.iter().enumerate() {
            if n == 0 {
                continue;
            }
            let upto = below + n;
            if upto as f64 >= rank {
                let lo = match i {
                    0 => min,
                    _ => self.boundaries[i - 1].max(min),
                } as f64;
                let hi = match self.boundaries.get(i) {
                    Some(&b) => b.min(max),
                    None => max,
                } as f64;
                let hi = hi.max(lo);
                let within = (rank - below as f64) / n as f64;
                return Some(lo + within * (hi - lo));
            }
            below = upto;
        }
        Some(max as f64)
    }
}

pub(crate) fn validate_boundaries(boundaries: &[i64]) -> Result<(), StatisticsError> {
    if boundaries.is_empty() {
        return Err(StatisticsError::NoBoundaries);
    }
    if boundaries.windows(2).any(|w| w[0] >= w[1]) {
        return Err(StatisticsError::NonAscendingBoundaries(boundaries.to_vec()));
    }
    Ok(())
}

pub(crate) fn validate_percentiles(percentiles: &[f64]) -> Result<(), StatisticsError> {
    if let Some(&p) = percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
        return Err(StatisticsError::InvalidPercentile(p));
    }
    for (i, p) in percentiles.iter().enumerate() {
        if percentiles[..i].contains(p) {
            return Err(StatisticsError::DuplicatePercentile(*p));
        }
    }
    Ok(())
}

/// `50.0` → `p50`, `99.9` → `p99.9`.
pub(crate) fn percentile_name(p: f64) -> String {
    if p.fract() == 0.0 {
        format!("p{}", p as i64)
    } else {
        format!("p{p}")
    }
}
