pub mod config;
pub mod registry;
pub mod statistics;

pub use config::StatisticsConfig;
pub use statistics::{Action, BasicsKind, StatisticsError, StatisticsKeeper};
