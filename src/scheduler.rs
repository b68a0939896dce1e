use std::sync::Arc;
use std::time::Duration;

use statistics_keeper::{Action, StatisticsKeeper};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Periodically closes the interval window of every keeper, logging the
/// interval that just ended.
pub fn spawn_mark_full(keepers: Vec<Arc<StatisticsKeeper>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for keeper in &keepers {
                let closed = keeper.perform_action(Action::MarkFull);
                info!(
                    keeper = keeper.name(),
                    count = closed.count,
                    min = ?closed.min,
                    max = ?closed.max,
                    avg = ?closed.avg(),
                    "interval closed"
                );
            }
        }
    })
}
