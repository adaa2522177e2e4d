//! Rate Resolution Service
//!
//! Answers "what is the rate from X to Y right now" from the cache, the
//! provider or, failing both, the last known value. Contains no HTTP or SQL;
//! the store and provider are injected through their ports.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use exchange_rates::StubRateProvider;
use fx_types::{
    AMOUNT_SCALE, ConvertResponse, CurrencyCode, DomainError, Freshness, ProviderError, RateEntry,
    RateError, RateProvider, RateSnapshot, RateSource, RateStore, Resolution, round_amount,
    round_rate,
};

use crate::freshness::FreshnessPolicy;

/// Engine parameters.
#[derive(Debug, Clone)]
pub struct RateServiceConfig {
    /// Currency the provider is queried against
    pub pivot: CurrencyCode,
    /// How long a stored rate stays fresh
    pub ttl: Duration,
    /// Rows fetched longer ago than this are deleted by cleanup
    pub retention: Duration,
    /// Minimum gap between two cleanup passes of the batch job
    pub cleanup_interval: Duration,
    /// Upper bound on one provider call made inside a request
    pub fetch_timeout: StdDuration,
}

impl Default for RateServiceConfig {
    fn default() -> Self {
        Self {
            pivot: CurrencyCode::usd(),
            ttl: Duration::hours(24),
            retention: Duration::days(90),
            cleanup_interval: Duration::hours(24),
            fetch_timeout: StdDuration::from_secs(5),
        }
    }
}

/// A rate together with how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    pub rate: Decimal,
    pub resolution: Resolution,
}

enum FetchOutcome {
    Resolved(ResolvedRate),
    NotQuoted,
    Failed(ProviderError),
}

/// Application service for rate lookups, conversion and overrides.
///
/// Generic over the store and provider ports so tests can inject in-memory
/// doubles.
pub struct RateService<S: RateStore, P: RateProvider> {
    store: Arc<S>,
    provider: P,
    config: RateServiceConfig,
    policy: FreshnessPolicy,
    /// One lock per pivot, held across a provider call.
    in_flight: DashMap<CurrencyCode, Arc<Mutex<()>>>,
    stale_usages: AtomicU64,
}

impl<S: RateStore, P: RateProvider> RateService<S, P> {
    /// Creates a service over a shared store.
    ///
    /// # Errors
    /// `ValidationError` when the retention horizon is not longer than the TTL.
    pub fn new(store: Arc<S>, provider: P, config: RateServiceConfig) -> Result<Self, DomainError> {
        let policy = FreshnessPolicy::new(config.ttl, config.retention)?;
        Ok(Self {
            store,
            provider,
            config,
            policy,
            in_flight: DashMap::new(),
            stale_usages: AtomicU64::new(0),
        })
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RateServiceConfig {
        &self.config
    }

    pub fn policy(&self) -> &FreshnessPolicy {
        &self.policy
    }

    /// Number of times an expired rate was served because the provider failed.
    pub fn stale_usage_count(&self) -> u64 {
        self.stale_usages.load(Ordering::Relaxed)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves the rate for a pair at the current time.
    pub async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ResolvedRate, RateError> {
        self.get_rate_at(from, to, Utc::now()).await
    }

    /// Resolves the rate for a pair as seen at `now`.
    ///
    /// Order: identity, fresh cache hit, provider fetch, stale fallback.
    /// Provider failures are never returned; only `RateUnavailable` and store
    /// errors are.
    #[tracing::instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn get_rate_at(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<ResolvedRate, RateError> {
        if from == to {
            return Ok(ResolvedRate {
                rate: Decimal::ONE,
                resolution: Resolution::Identity,
            });
        }

        let cached = self.store.get_rate(from, to).await?;
        if self.policy.classify(cached.as_ref(), now) == Freshness::Fresh {
            if let Some(entry) = cached {
                debug!(rate = %entry.rate, "Cache hit");
                return Ok(ResolvedRate {
                    rate: entry.rate,
                    resolution: Resolution::Cached,
                });
            }
        }

        match self.fetch_and_resolve(from, to, now).await? {
            FetchOutcome::Resolved(resolved) => return Ok(resolved),
            FetchOutcome::NotQuoted => {
                warn!(pivot = %self.config.pivot, "Provider snapshot does not quote the pair");
            }
            FetchOutcome::Failed(e) => {
                warn!(pivot = %self.config.pivot, error = %e, "Provider fetch failed, falling back");
            }
        }

        self.record_pair_failure(from, to).await;
        self.fallback(from, to).await
    }

    async fn fetch_and_resolve(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<FetchOutcome, RateError> {
        let lock = self.pivot_lock();
        let _guard = lock.lock().await;

        // Another caller may have refreshed the pair while we waited.
        if let Some(entry) = self.store.get_rate(from, to).await? {
            if self.policy.classify(Some(&entry), now) == Freshness::Fresh {
                debug!("Pair refreshed by a concurrent fetch");
                return Ok(FetchOutcome::Resolved(ResolvedRate {
                    rate: entry.rate,
                    resolution: Resolution::Cached,
                }));
            }
        }

        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => return Ok(FetchOutcome::Failed(e)),
        };
        self.write_snapshot(&snapshot, now).await;

        let pivot = &self.config.pivot;
        let resolved = if from == pivot {
            self.pivot_entries(&snapshot, to, now)
                .map(|(direct, _)| direct.rate)
        } else if to == pivot {
            self.pivot_entries(&snapshot, from, now)
                .map(|(_, inverse)| inverse.rate)
        } else {
            match self.write_cross_pair(&snapshot, from, to, now).await {
                Err(RateError::Store(e)) => return Err(e.into()),
                other => other,
            }
        };

        Ok(match resolved {
            Ok(rate) => FetchOutcome::Resolved(ResolvedRate {
                rate,
                resolution: Resolution::Fetched,
            }),
            Err(_) => FetchOutcome::NotQuoted,
        })
    }

    async fn fallback(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ResolvedRate, RateError> {
        match self.store.get_rate(from, to).await? {
            Some(entry) => {
                self.stale_usages.fetch_add(1, Ordering::Relaxed);
                warn!(
                    from = %from,
                    to = %to,
                    rate = %entry.rate,
                    expires_at = %entry.expires_at,
                    "Serving stale exchange rate"
                );
                Ok(ResolvedRate {
                    rate: entry.rate,
                    resolution: Resolution::StaleFallback,
                })
            }
            None => match self.stale_cross_rate(from, to).await? {
                Some(rate) => {
                    self.stale_usages.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        from = %from,
                        to = %to,
                        rate = %rate,
                        pivot = %self.config.pivot,
                        "Serving stale exchange rate triangulated from stored pivot legs"
                    );
                    Ok(ResolvedRate {
                        rate,
                        resolution: Resolution::StaleFallback,
                    })
                }
                None => Err(RateError::RateUnavailable {
                    from: from.clone(),
                    to: to.clone(),
                }),
            },
        }
    }

    /// Cross rate from whatever pivot legs are stored, regardless of age.
    /// Nothing is written back.
    async fn stale_cross_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<Decimal>, RateError> {
        let pivot = &self.config.pivot;
        if from == pivot || to == pivot {
            return Ok(None);
        }

        let (Some(from_leg), Some(to_leg)) = (
            self.store.get_rate(pivot, from).await?,
            self.store.get_rate(pivot, to).await?,
        ) else {
            return Ok(None);
        };

        Ok(to_leg
            .rate
            .checked_div(from_leg.rate)
            .map(round_rate)
            .filter(|rate| !rate.is_zero()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conversion and overrides
    // ─────────────────────────────────────────────────────────────────────────

    /// Converts `amount` at the current rate.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<ConvertResponse, RateError> {
        self.convert_at(amount, from, to, Utc::now()).await
    }

    /// Converts `amount` and returns the rate applied, rounded to two
    /// fractional digits with banker's rounding.
    #[tracing::instrument(skip(self), fields(from = %from, to = %to, amount = %amount))]
    pub async fn convert_at(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<ConvertResponse, RateError> {
        if amount.normalize().scale() > AMOUNT_SCALE {
            return Err(DomainError::ValidationError(format!(
                "amount {} has more than {} fractional digits",
                amount, AMOUNT_SCALE
            ))
            .into());
        }

        let resolved = self.get_rate_at(from, to, now).await?;
        let converted = amount
            .checked_mul(resolved.rate)
            .map(round_amount)
            .ok_or_else(|| DomainError::ValidationError("converted amount overflows".into()))?;

        Ok(ConvertResponse {
            amount,
            from: from.clone(),
            to: to.clone(),
            converted_amount: converted,
            rate: resolved.rate,
            resolution: resolved.resolution,
        })
    }

    /// Stores an operator override at the current time.
    pub async fn set_manual_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: Decimal,
    ) -> Result<RateEntry, RateError> {
        self.set_manual_rate_at(from, to, rate, Utc::now()).await
    }

    /// Stores `MANUAL` from→to and its `SYSTEM` inverse in one transaction.
    /// The override expires like any other entry.
    #[tracing::instrument(skip(self), fields(from = %from, to = %to, rate = %rate))]
    pub async fn set_manual_rate_at(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<RateEntry, RateError> {
        let direct = RateEntry::new(
            from.clone(),
            to.clone(),
            rate,
            RateSource::Manual,
            now.date_naive(),
            now,
            self.config.ttl,
        )?;
        let inverse = direct.inverse()?;

        self.store.upsert_rate_pair(&direct, &inverse).await?;
        info!(rate = %direct.rate, "Manual rate stored");
        Ok(direct)
    }

    /// Writes the built-in stub table as `STUB` rows, leaving existing rows
    /// untouched. Returns the number of rows written.
    #[tracing::instrument(skip(self))]
    pub async fn seed_stub_rates_at(&self, now: DateTime<Utc>) -> Result<usize, RateError> {
        let pivot = &self.config.pivot;
        let snapshot = StubRateProvider::new()
            .snapshot(pivot)
            .map_err(|e| DomainError::ValidationError(e.to_string()))?;

        let mut codes: Vec<&CurrencyCode> = snapshot.rates.keys().collect();
        codes.sort();

        let mut written = 0;
        for code in codes {
            let direct = RateEntry::new(
                pivot.clone(),
                code.clone(),
                snapshot.rates[code],
                RateSource::Stub,
                snapshot.as_of_date,
                now,
                self.config.ttl,
            )?;
            let inverse = direct.inverse()?;

            let has_direct = self.store.get_rate(pivot, code).await?.is_some();
            let has_inverse = self.store.get_rate(code, pivot).await?.is_some();
            match (has_direct, has_inverse) {
                (false, false) => {
                    self.store.upsert_rate_pair(&direct, &inverse).await?;
                    written += 2;
                }
                (false, true) => {
                    self.store.upsert_rate(&direct).await?;
                    written += 1;
                }
                (true, false) => {
                    self.store.upsert_rate(&inverse).await?;
                    written += 1;
                }
                (true, true) => {}
            }
        }

        info!(rows = written, "Stub rates seeded");
        Ok(written)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fetch and store (shared with the batch job)
    // ─────────────────────────────────────────────────────────────────────────

    fn pivot_lock(&self) -> Arc<Mutex<()>> {
        self.in_flight
            .entry(self.config.pivot.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetches the pivot snapshot unconditionally, serialized with in-request
    /// fetches.
    pub async fn fetch_pivot(&self) -> Result<RateSnapshot, ProviderError> {
        let lock = self.pivot_lock();
        let _guard = lock.lock().await;
        self.fetch_snapshot().await
    }

    async fn fetch_snapshot(&self) -> Result<RateSnapshot, ProviderError> {
        let pivot = &self.config.pivot;
        let fetch = self.provider.fetch(pivot);

        match tokio::time::timeout(self.config.fetch_timeout, fetch).await {
            Ok(Ok(snapshot)) if snapshot.base == *pivot => {
                info!(
                    provider = self.provider.name(),
                    base = %pivot,
                    currencies = snapshot.rates.len(),
                    "Fetched rate snapshot"
                );
                Ok(snapshot)
            }
            Ok(Ok(snapshot)) => Err(ProviderError::Provider(format!(
                "snapshot base {} does not match pivot {}",
                snapshot.base, pivot
            ))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Network(format!(
                "provider call timed out after {:?}",
                self.config.fetch_timeout
            ))),
        }
    }

    /// Builds pivot→code (`API`) and code→pivot (`SYSTEM`) from a snapshot.
    fn pivot_entries(
        &self,
        snapshot: &RateSnapshot,
        code: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<(RateEntry, RateEntry), RateError> {
        let rate = snapshot
            .rates
            .get(code)
            .copied()
            .ok_or_else(|| RateError::RateUnavailable {
                from: snapshot.base.clone(),
                to: code.clone(),
            })?;

        let direct = RateEntry::new(
            snapshot.base.clone(),
            code.clone(),
            rate,
            RateSource::Api,
            snapshot.as_of_date,
            now,
            self.config.ttl,
        )?
        .with_provider(self.provider.name());
        let inverse = direct.inverse()?;
        Ok((direct, inverse))
    }

    /// Stores the pivot pair for one currency.
    pub async fn write_pivot_pair(
        &self,
        snapshot: &RateSnapshot,
        code: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<(), RateError> {
        let (direct, inverse) = self.pivot_entries(snapshot, code, now)?;
        self.store.upsert_rate_pair(&direct, &inverse).await?;
        Ok(())
    }

    /// Triangulates from→to through the snapshot's base, stores it `SYSTEM`
    /// with its inverse and returns the from→to rate.
    pub async fn write_cross_pair(
        &self,
        snapshot: &RateSnapshot,
        from: &CurrencyCode,
        to: &CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<Decimal, RateError> {
        let unavailable = || RateError::RateUnavailable {
            from: from.clone(),
            to: to.clone(),
        };
        let base_to_from = snapshot.rate_for(from).ok_or_else(unavailable)?;
        let base_to_to = snapshot.rate_for(to).ok_or_else(unavailable)?;
        let rate = base_to_to
            .checked_div(base_to_from)
            .map(round_rate)
            .ok_or_else(unavailable)?;

        let direct = RateEntry::new(
            from.clone(),
            to.clone(),
            rate,
            RateSource::System,
            snapshot.as_of_date,
            now,
            self.config.ttl,
        )?;
        let inverse = direct.inverse()?;
        self.store.upsert_rate_pair(&direct, &inverse).await?;
        Ok(direct.rate)
    }

    /// Stores every pivot pair in the snapshot. Per-pair failures are logged
    /// and skipped. Returns the number of pairs written.
    async fn write_snapshot(&self, snapshot: &RateSnapshot, now: DateTime<Utc>) -> usize {
        let mut written = 0;
        for code in snapshot.rates.keys() {
            if *code == snapshot.base {
                continue;
            }
            match self.write_pivot_pair(snapshot, code, now).await {
                Ok(()) => written += 1,
                Err(e) => warn!(code = %code, error = %e, "Failed to store pivot rate"),
            }
        }
        debug!(pairs = written, "Snapshot stored");
        written
    }

    /// Bumps failure counters on a pivot pair. Store errors are logged only.
    pub async fn record_failure(&self, from: &CurrencyCode, to: &CurrencyCode) {
        if let Err(e) = self.store.record_fetch_failure(from, to).await {
            warn!(from = %from, to = %to, error = %e, "Failed to record fetch failure");
        }
    }

    async fn record_pair_failure(&self, from: &CurrencyCode, to: &CurrencyCode) {
        let pivot = &self.config.pivot;
        if from != pivot {
            self.record_failure(pivot, from).await;
        }
        if to != pivot {
            self.record_failure(pivot, to).await;
        }
        if from != pivot && to != pivot {
            self.record_failure(from, to).await;
        }
    }
}
