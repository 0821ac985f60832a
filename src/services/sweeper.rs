//! Periodic overdue/returned sweeper task

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::services::circulation::CirculationService;

/// Spawn the background task running a sweep pass at a fixed interval.
///
/// The first tick fires immediately, so due loans left over from downtime
/// are caught up as soon as the server starts.
pub fn spawn(circulation: CirculationService, interval_seconds: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = circulation.sweep().await {
                tracing::warn!("Sweep pass failed: {}", e);
            }
        }
    })
}
