//! Online statistics for named measurement points.
//!
//! A [`StatisticsKeeper`] aggregates a stream of observations into count,
//! min, max, sums, variance, threshold fractions and estimated percentiles,
//! both since creation and since the last [`Action::MarkFull`]. No samples
//! are retained.

mod basics;
mod error;
mod histogram_basics;
mod interval;
mod keeper;
pub mod percentiles;
mod schema;

pub use basics::{Basics, BasicsKind, CumulativeState, DirectBasics};
pub use error::StatisticsError;
pub use histogram_basics::HistogramBasics;
pub use interval::IntervalTracker;
pub use keeper::{Action, PercentileValue, StatisticsKeeper, StatisticsSnapshot, ViewSnapshot};
pub use percentiles::{Bucket, PercentileEstimator};
pub use schema::{Item, ItemType, ItemValue, MapValue};
