use crate::state::AppState;
use crate::stats::StatsFetcher;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Resolves download links once and starts the stats poller.
pub fn spawn_background(state: &AppState) -> JoinHandle<()> {
    let downloads = Arc::clone(&state.downloads);
    tokio::spawn(async move {
        downloads.resolve_all().await;
    });

    spawn_stats_polling(Arc::clone(&state.stats), state.poll_interval)
}

/// Runs `refresh_all` immediately and then once per `period`. Each batch gets its own
/// task, so a slow batch never holds back the next tick.
pub fn spawn_stats_polling(stats: Arc<StatsFetcher>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticks.tick().await;
            let stats = Arc::clone(&stats);
            tokio::spawn(async move {
                let summary = stats.refresh_all().await;
                info!(
                    "stats refreshed: {} fetched, {} cached, {} failed",
                    summary.fetched, summary.cached, summary.failed
                );
            });
        }
    })
}
