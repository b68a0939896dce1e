use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use super::basics::{Basics, BasicsKind, CumulativeState};
use super::interval::IntervalTracker;
use super::percentiles::{percentile_name, Bucket, PercentileEstimator};
use super::schema::{Item, ItemSource, ItemType, ItemValue, MapValue};
use super::StatisticsError;
use crate::config::StatisticsConfig;
use crate::registry::{MetricId, MetricsRegistry};

// ─── Actions ─────────────────────────────────────────────────────

/// Lifecycle actions triggered from outside the keeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Close the interval window and start a new one.
    MarkFull,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::MarkFull => "MARK_FULL",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = StatisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARK_FULL" | "mark_full" => Ok(Action::MarkFull),
            _ => Err(StatisticsError::UnknownAction(s.to_string())),
        }
    }
}

// ─── Snapshots ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileValue {
    pub percentile: f64,
    pub value: Option<f64>,
}

/// Point-in-time copy of one view (cumulative or interval).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    #[serde(flatten)]
    pub state: CumulativeState,
    pub avg: Option<f64>,
    pub std_dev: Option<f64>,
    /// Observations held by the view's estimator, overflow bin included
    pub total: u64,
    pub buckets: Vec<Bucket>,
    pub percentiles: Vec<PercentileValue>,
}

impl ViewSnapshot {
    fn capture(state: CumulativeState, estimator: &PercentileEstimator, percentiles: &[f64]) -> Self {
        Self {
            state,
            avg: state.avg(),
            std_dev: state.std_dev(),
            total: estimator.total(),
            buckets: estimator.buckets(),
            percentiles: percentiles
                .iter()
                .map(|&p| PercentileValue {
                    percentile: p,
                    value: estimator.estimate_percentile(p, state.min, state.max),
                })
                .collect(),
        }
    }

    /// Percentage of this view's observations below `buckets[idx].boundary`.
    pub fn fraction_below(&self, idx: usize) -> Option<f64> {
        let bucket = self.buckets.get(idx)?;
        if self.state.count == 0 {
            return None;
        }
        Some(100.0 * bucket.cumulative_count as f64 / self.state.count as f64)
    }

    pub fn value(&self, item: &Item) -> Option<ItemValue> {
        let s = &self.state;
        match item.source {
            ItemSource::Count => Some(ItemValue::Integer(s.count as i128)),
            ItemSource::Min => s.min.map(|v| ItemValue::Integer(v as i128)),
            ItemSource::Max => s.max.map(|v| ItemValue::Integer(v as i128)),
            ItemSource::Avg => self.avg.map(ItemValue::Number),
            ItemSource::Sum => Some(ItemValue::Integer(s.sum as i128)),
            ItemSource::SumSquare => Some(ItemValue::Integer(s.sum_square)),
            ItemSource::StdDev => self.std_dev.map(ItemValue::Number),
            ItemSource::Threshold(idx) => self.fraction_below(idx).map(ItemValue::Percentage),
            ItemSource::Percentile(idx) => self
                .percentiles
                .get(idx)
                .and_then(|p| p.value)
                .map(ItemValue::Number),
        }
    }
}

/// Consistent copy of both views of a keeper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub name: String,
    pub marked_at: DateTime<Utc>,
    pub cumulative: ViewSnapshot,
    pub interval: ViewSnapshot,
}

// ─── Keeper ──────────────────────────────────────────────────────

/// Statistics for one named measurement point.
///
/// Producers call [`add_value`](Self::add_value), a scheduler periodically
/// calls [`perform_action`](Self::perform_action) with [`Action::MarkFull`],
/// readers take snapshots. All three share one lock, so readers never see a
/// half-applied observation and none is lost across a mark.
pub struct StatisticsKeeper {
    name: String,
    unit: String,
    percentiles: Vec<f64>,
    items: Vec<Item>,
    inner: Mutex<Inner>,
}

struct Inner {
    basics: Box<dyn Basics>,
    distribution: PercentileEstimator,
    interval: IntervalTracker,
}

impl StatisticsKeeper {
    pub fn new(name: impl Into<String>, config: &StatisticsConfig) -> Result<Self, StatisticsError> {
        config.validate()?;
        let distribution = PercentileEstimator::new(config.boundaries.clone())?;
        let inner = Inner {
            basics: config.basics.build()?,
            interval: IntervalTracker::new(distribution.clone()),
            distribution,
        };

        Ok(Self {
            name: name.into(),
            unit: config.unit.clone(),
            percentiles: config.percentiles.clone(),
            items: build_items(config),
            inner: Mutex::new(inner),
        })
    }

    /// Keeper with default boundaries and percentiles.
    pub fn with_basics(name: impl Into<String>, basics: BasicsKind) -> Result<Self, StatisticsError> {
        Self::new(name, &StatisticsConfig::with_basics(basics))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    // ── Write side ──────────────────────────────────────────────

    pub fn add_value(&self, value: i64) {
        let mut inner = self.inner.lock();
        inner.basics.add_value(value);
        inner.distribution.record(value);
        inner.interval.record(value);
    }

    /// Record a real-valued observation, rounded to the nearest integer.
    ///
    /// NaN and infinities are rejected and leave the keeper untouched.
    pub fn add_float(&self, value: f64) -> Result<(), StatisticsError> {
        if !value.is_finite() {
            warn!(keeper = %self.name, value, "rejecting non-finite observation");
            return Err(StatisticsError::NonFiniteValue(value));
        }
        // float-to-int `as` saturates
        self.add_value(value.round() as i64);
        Ok(())
    }

    /// Record an elapsed time in whole milliseconds.
    pub fn add_duration(&self, elapsed: Duration) {
        self.add_value(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    }

    /// Apply a lifecycle action. `MarkFull` returns the interval it closed.
    pub fn perform_action(&self, action: Action) -> CumulativeState {
        match action {
            Action::MarkFull => {
                let mut inner = self.inner.lock();
                let cumulative = inner.basics.state();
                let closed = inner.interval.mark_full(&cumulative);
                drop(inner);
                debug!(keeper = %self.name, count = closed.count, "interval closed");
                closed
            }
        }
    }

    // ── Read side ───────────────────────────────────────────────

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let inner = self.inner.lock();
        let cumulative = inner.basics.state();
        let interval = inner.interval.interval_state(&cumulative);
        StatisticsSnapshot {
            name: self.name.clone(),
            marked_at: inner.interval.marked_at(),
            cumulative: ViewSnapshot::capture(cumulative, &inner.distribution, &self.percentiles),
            interval: ViewSnapshot::capture(interval, inner.interval.estimator(), &self.percentiles),
        }
    }

    /// All-time aggregate.
    pub fn cumulative(&self) -> CumulativeState {
        self.inner.lock().basics.state()
    }

    /// Aggregate since the last mark.
    pub fn interval(&self) -> CumulativeState {
        let inner = self.inner.lock();
        inner.interval.interval_state(&inner.basics.state())
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item_index(&self, name: &str) -> Result<usize, StatisticsError> {
        self.items
            .iter()
            .position(|item| item.name == name)
            .ok_or_else(|| StatisticsError::UnknownItem(name.to_string()))
    }

    pub fn item_name(&self, index: usize) -> Result<&str, StatisticsError> {
        self.item(index).map(|item| item.name.as_str())
    }

    pub fn item_value(&self, index: usize) -> Result<Option<ItemValue>, StatisticsError> {
        let item = self.item(index)?;
        Ok(self.view(false).value(item))
    }

    /// Interval items share the cumulative schema.
    pub fn interval_item_name(&self, index: usize) -> Result<&str, StatisticsError> {
        self.item_name(index)
    }

    pub fn interval_item_value(&self, index: usize) -> Result<Option<ItemValue>, StatisticsError> {
        let item = self.item(index)?;
        Ok(self.view(true).value(item))
    }

    /// One view only, under a single lock.
    fn view(&self, interval: bool) -> ViewSnapshot {
        let inner = self.inner.lock();
        let cumulative = inner.basics.state();
        if interval {
            let state = inner.interval.interval_state(&cumulative);
            ViewSnapshot::capture(state, inner.interval.estimator(), &self.percentiles)
        } else {
            ViewSnapshot::capture(cumulative, &inner.distribution, &self.percentiles)
        }
    }

    fn item(&self, index: usize) -> Result<&Item, StatisticsError> {
        self.items.get(index).ok_or(StatisticsError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Display map of the cumulative view, keyed as [`labels`](Self::labels).
    pub fn as_map(&self) -> IndexMap<String, MapValue> {
        let view = self.view(false);
        let s = view.state;
        let integer = |v: Option<i64>| v.map_or(MapValue::Null, MapValue::Integer);
        let decimal = |v: Option<f64>| v.map_or(MapValue::Null, MapValue::Decimal);

        let mut map = IndexMap::with_capacity(6 + view.buckets.len());
        map.insert("name".to_string(), MapValue::Text(self.name.clone()));
        map.insert(
            "count".to_string(),
            MapValue::Integer(i64::try_from(s.count).unwrap_or(i64::MAX)),
        );
        map.insert("min".to_string(), integer(s.min));
        map.insert("max".to_string(), integer(s.max));
        map.insert("avg".to_string(), decimal(view.avg));
        map.insert("stdDev".to_string(), decimal(view.std_dev));
        for (idx, bucket) in view.buckets.iter().enumerate() {
            let value = view
                .fraction_below(idx)
                .map_or(MapValue::Null, MapValue::Percentage);
            map.insert(format!("{}{}", bucket.boundary, self.unit), value);
        }
        map
    }

    /// Ordered `(field, kind)` pairs of [`as_map`](Self::as_map) for a configuration.
    pub fn map_schema(config: &StatisticsConfig) -> Vec<(String, ItemType)> {
        let mut schema = vec![
            ("name".to_string(), ItemType::String),
            ("count".to_string(), ItemType::Integer),
            ("min".to_string(), ItemType::Integer),
            ("max".to_string(), ItemType::Integer),
            ("avg".to_string(), ItemType::Number),
            ("stdDev".to_string(), ItemType::Number),
        ];
        schema.extend(
            config
                .boundaries
                .iter()
                .map(|&b| (config.threshold_name(b), ItemType::Percentage)),
        );
        schema
    }

    /// Field names of the default display schema.
    pub fn labels() -> Vec<String> {
        default_map_schema().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Field kinds of the default display schema, parallel to [`labels`](Self::labels).
    pub fn types() -> Vec<ItemType> {
        default_map_schema().iter().map(|(_, kind)| *kind).collect()
    }

    // ── Registry ────────────────────────────────────────────────

    /// Publish every cumulative item as a gauge named `<group>.<item>`.
    ///
    /// Gauges hold a weak reference; once the keeper is dropped they report
    /// no data. Registration is all or nothing: if the registry refuses one
    /// gauge, those already added for this keeper are removed again.
    pub fn init_metrics(
        self: &Arc<Self>,
        registry: &dyn MetricsRegistry,
        group: &str,
        labels: &[(String, String)],
    ) -> Result<(), StatisticsError> {
        let ids: Vec<MetricId> = self
            .items
            .iter()
            .map(|item| {
                let mut id = MetricId::new(format!("{group}.{}", item.name)).with_label("name", &self.name);
                id.labels.extend(labels.iter().cloned());
                id
            })
            .collect();

        for (index, id) in ids.iter().enumerate() {
            let keeper = Arc::downgrade(self);
            let probe = Box::new(move || {
                let keeper = keeper.upgrade()?;
                keeper.item_value(index).ok().flatten().map(|v| v.as_f64())
            });

            if let Err(e) = registry.register_gauge(id.clone(), probe) {
                for registered in &ids[..index] {
                    registry.unregister_gauge(registered);
                }
                warn!(keeper = %self.name, metric = %id.name, error = %e, "metric registration rolled back");
                return Err(StatisticsError::Registration {
                    name: id.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
        debug!(keeper = %self.name, group, gauges = ids.len(), "metrics registered");
        Ok(())
    }
}

impl fmt::Debug for StatisticsKeeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cumulative();
        f.debug_struct("StatisticsKeeper")
            .field("name", &self.name)
            .field("count", &state.count)
            .field("min", &state.min)
            .field("max", &state.max)
            .field("sum", &state.sum)
            .finish()
    }
}

fn default_map_schema() -> &'static [(String, ItemType)] {
    static SCHEMA: OnceLock<Vec<(String, ItemType)>> = OnceLock::new();
    SCHEMA.get_or_init(|| StatisticsKeeper::map_schema(&StatisticsConfig::default()))
}

fn build_items(config: &StatisticsConfig) -> Vec<Item> {
    let mut items = vec![
        Item::new("count", ItemType::Integer, ItemSource::Count),
        Item::new("min", ItemType::Integer, ItemSource::Min),
        Item::new("max", ItemType::Integer, ItemSource::Max),
        Item::new("avg", ItemType::Number, ItemSource::Avg),
        Item::new("sum", ItemType::Integer, ItemSource::Sum),
        Item::new("sumSq", ItemType::Integer, ItemSource::SumSquare),
        Item::new("stdDev", ItemType::Number, ItemSource::StdDev),
    ];
    for (idx, &boundary) in config.boundaries.iter().enumerate() {
        items.push(Item::new(
            config.threshold_name(boundary),
            ItemType::Percentage,
            ItemSource::Threshold(idx),
        ));
    }
    for (idx, &p) in config.percentiles.iter().enumerate() {
        items.push(Item::new(percentile_name(p), ItemType::Number, ItemSource::Percentile(idx)));
    }
    items
}
