use hdrhistogram::Histogram;
use tracing::warn;

use super::basics::Basics;
use super::StatisticsError;

/// Largest magnitude kept at full histogram resolution. Anything above it is
/// recorded into the top bucket.
const HIST_HIGH: u64 = 1 << 32;
/// 2 significant figures: 1% relative bucket width, about 27 KB per histogram.
const HIST_SIGFIG: u8 = 2;

/// [`Basics`] backed by bounded HdrHistogram distributions.
///
/// min/max and the two sums are kept exactly next to the histograms, which
/// only hold bucketed magnitudes. Negative observations go into a second
/// histogram by magnitude. The count is the number of recorded samples.
pub struct HistogramBasics {
    positive: Histogram<u64>,
    negative: Histogram<u64>,
    min: Option<i64>,
    max: Option<i64>,
    sum: i64,
    sum_square: i128,
}

impl HistogramBasics {
    pub fn new() -> Result<Self, StatisticsError> {
        let create = || {
            Histogram::<u64>::new_with_bounds(1, HIST_HIGH, HIST_SIGFIG)
                .map_err(|e| StatisticsError::Histogram(e.to_string()))
        };
        Ok(Self {
            positive: create()?,
            negative: create()?,
            min: None,
            max: None,
            sum: 0,
            sum_square: 0,
        })
    }

    /// Approximate value at quantile `q` in `[0, 1]`, within the histogram
    /// precision. Magnitudes beyond the tracked range report the range top.
    pub fn value_at_quantile(&self, q: f64) -> Option<i64> {
        let total = self.count();
        if total == 0 || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let negatives = self.negative.len();
        let rank = ((q * total as f64).ceil() as u64).clamp(1, total);
        if rank <= negatives {
            // negatives are stored by magnitude, so rank k from the bottom is
            // rank (negatives - k + 1) from the top of that histogram
            let from_top = (negatives - rank + 1) as f64 / negatives as f64;
            let magnitude = self.negative.value_at_quantile(from_top);
            return Some(-clamp(self.negative.lowest_equivalent(magnitude)));
        }
        let within = (rank - negatives) as f64 / self.positive.len() as f64;
        Some(clamp(self.positive.value_at_quantile(within)))
    }
}

impl Basics for HistogramBasics {
    fn add_value(&mut self, value: i64) {
        let magnitude = value.unsigned_abs().min(HIST_HIGH);
        let recorded = if value >= 0 {
            self.positive.record(magnitude)
        } else {
            self.negative.record(magnitude)
        };
        if let Err(e) = recorded {
            warn!(value, error = %e, "histogram could not record value");
        }

        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.sum = self.sum.saturating_add(value);
        self.sum_square = self
            .sum_square
            .saturating_add((value as i128) * (value as i128));
    }

    fn reset(&mut self) {
        self.positive.reset();
        self.negative.reset();
        self.min = None;
        self.max = None;
        self.sum = 0;
        self.sum_square = 0;
    }

    fn count(&self) -> u64 {
        self.positive.len() + self.negative.len()
    }

    fn min(&self) -> Option<i64> {
        self.min
    }

    fn max(&self) -> Option<i64> {
        self.max
    }

    fn sum(&self) -> i64 {
        self.sum
    }

    fn sum_square(&self) -> i128 {
        self.sum_square
    }
}

fn clamp(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}
