//! In-process schedule for the batch refresh job.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use fx_hex::RefreshJob;
use fx_types::{RateProvider, RateStore};

/// Runs the job every `every`, starting immediately. A slow run delays the
/// next tick instead of queueing a burst.
pub fn spawn_refresh_loop<S: RateStore, P: RateProvider>(
    job: Arc<RefreshJob<S, P>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(every_secs = every.as_secs(), "Refresh scheduler started");
        loop {
            ticker.tick().await;
            let summary = job.run().await;
            if summary.failures > 0 {
                tracing::warn!(
                    run_id = %summary.run_id,
                    failures = summary.failures,
                    "Scheduled refresh finished with failures"
                );
            }
        }
    })
}
