//! Periodic sampling and persistence, off the request path.

use crate::helpers;
use statline_store::StatsStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Delay before the first firing, so a sample lands shortly after boot.
const STARTUP_DELAY: Duration = Duration::from_secs(1);

/// Spawn the collection task: fires once shortly after start, then at the
/// configured interval until shutdown is signalled. An in-flight cycle
/// always completes before the task exits.
pub fn spawn(
    store: Arc<StatsStore>,
    interval: Duration,
    retention_days: u32,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + STARTUP_DELAY, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => collect_once(&store, retention_days).await,
                _ = shutdown.changed() => break,
            }
        }
        tracing::debug!("collection task stopped");
    })
}

/// One collection cycle: snapshot the current online count, then flush.
/// Persistence failures are logged inside the store and never propagate,
/// so one bad cycle cannot cancel future firings.
pub async fn collect_once(store: &StatsStore, retention_days: u32) {
    let now = helpers::now_millis();
    let online = store.online_count() as u32;
    store.sample_online_count(online, now).await;
    store.flush(retention_days, now).await;
    tracing::debug!(online, "collected online sample");
}
