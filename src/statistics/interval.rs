use chrono::{DateTime, Utc};

use super::basics::CumulativeState;
use super::percentiles::PercentileEstimator;

/// Tracks observations since the last mark-full action.
///
/// count/sum/sumSq come from subtracting the baseline captured at the mark;
/// min/max and the distribution are collected separately because they cannot
/// be derived by subtraction.
#[derive(Debug, Clone)]
pub struct IntervalTracker {
    baseline: CumulativeState,
    min: Option<i64>,
    max: Option<i64>,
    estimator: PercentileEstimator,
    marked_at: DateTime<Utc>,
}

impl IntervalTracker {
    pub fn new(estimator: PercentileEstimator) -> Self {
        Self {
            baseline: CumulativeState::default(),
            min: None,
            max: None,
            estimator,
            marked_at: Utc::now(),
        }
    }

    pub fn record(&mut self, value: i64) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.estimator.record(value);
    }

    pub fn baseline(&self) -> &CumulativeState {
        &self.baseline
    }

    pub fn estimator(&self) -> &PercentileEstimator {
        &self.estimator
    }

    /// Creation time until the first mark.
    pub fn marked_at(&self) -> DateTime<Utc> {
        self.marked_at
    }

    pub fn interval_state(&self, cumulative: &CumulativeState) -> CumulativeState {
        let mut state = cumulative.since(&self.baseline);
        if state.count > 0 {
            state.min = self.min;
            state.max = self.max;
        }
        state
    }

    /// Close the current interval, returning its final state.
    pub fn mark_full(&mut self, cumulative: &CumulativeState) -> CumulativeState {
        let closed = self.interval_state(cumulative);
        self.baseline = *cumulative;
        self.min = None;
        self.max = None;
        self.estimator.reset();
        self.marked_at = Utc::now();
        closed
    }
}
