//! Batch refresh job.
//!
//! One pivot fetch per run covers every active currency; cross rates between
//! active currencies are triangulated from the same snapshot. Nothing here
//! returns an error: failures are counted into the summary.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use fx_types::{CurrencyCode, RateProvider, RateStore, RefreshSummary};

use crate::RateService;

/// Periodic refresh of the active currency set.
pub struct RefreshJob<S: RateStore, P: RateProvider> {
    service: Arc<RateService<S, P>>,
    last_cleanup: Mutex<Option<DateTime<Utc>>>,
}

impl<S: RateStore, P: RateProvider> RefreshJob<S, P> {
    pub fn new(service: Arc<RateService<S, P>>) -> Self {
        Self {
            service,
            last_cleanup: Mutex::new(None),
        }
    }

    pub fn service(&self) -> &Arc<RateService<S, P>> {
        &self.service
    }

    /// Runs the job at the current time.
    pub async fn run(&self) -> RefreshSummary {
        self.run_at(Utc::now()).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> RefreshSummary {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let service = &self.service;
        let pivot = service.config().pivot.clone();

        let active: Vec<CurrencyCode> = match service.store().list_active_currencies().await {
            Ok(codes) => codes.into_iter().filter(|c| *c != pivot).collect(),
            Err(e) => {
                warn!(%run_id, error = %e, "Failed to list active currencies");
                Vec::new()
            }
        };

        let mut pairs_refreshed = 0;
        let mut failures = 0;

        if !active.is_empty() {
            match service.fetch_pivot().await {
                Ok(snapshot) => {
                    let mut refreshed = Vec::with_capacity(active.len());
                    for code in &active {
                        match service.write_pivot_pair(&snapshot, code, now).await {
                            Ok(()) => {
                                pairs_refreshed += 1;
                                refreshed.push(code);
                            }
                            Err(e) => {
                                failures += 1;
                                warn!(%run_id, code = %code, error = %e, "Currency refresh failed");
                                service.record_failure(&pivot, code).await;
                            }
                        }
                    }

                    for (i, from) in refreshed.iter().enumerate() {
                        for to in &refreshed[i + 1..] {
                            match service.write_cross_pair(&snapshot, from, to, now).await {
                                Ok(_) => pairs_refreshed += 1,
                                Err(e) => {
                                    failures += 1;
                                    warn!(%run_id, from = %from, to = %to, error = %e, "Cross rate refresh failed");
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(%run_id, error = %e, "Pivot fetch failed, batch refresh skipped");
                    failures = active.len();
                    for code in &active {
                        service.record_failure(&pivot, code).await;
                    }
                }
            }
        }

        let stale_marked = match service.policy().stale_pass(service.store(), now).await {
            Ok(n) => n,
            Err(e) => {
                warn!(%run_id, error = %e, "Stale pass failed");
                0
            }
        };

        let (cleanup_ran, cleaned_up) = self.maybe_cleanup(run_id, now).await;

        let summary = RefreshSummary {
            run_id,
            started_at: now,
            active_currencies: active.len(),
            pairs_refreshed,
            failures,
            stale_marked,
            cleaned_up,
            cleanup_ran,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            %run_id,
            active = summary.active_currencies,
            refreshed = summary.pairs_refreshed,
            failures = summary.failures,
            stale_marked = summary.stale_marked,
            cleaned_up = summary.cleaned_up,
            elapsed_ms = summary.elapsed_ms,
            "Rate refresh finished"
        );
        summary
    }

    async fn maybe_cleanup(&self, run_id: Uuid, now: DateTime<Utc>) -> (bool, u64) {
        let mut last = self.last_cleanup.lock().await;
        let due = match *last {
            None => true,
            Some(at) => now - at >= self.service.config().cleanup_interval,
        };
        if !due {
            return (false, 0);
        }

        let service = &self.service;
        match service.policy().cleanup_pass(service.store(), now).await {
            Ok(deleted) => {
                *last = Some(now);
                (true, deleted)
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Cleanup pass failed");
                (false, 0)
            }
        }
    }
}
