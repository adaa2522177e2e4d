//! Local provider-call budget using Governor.
//!
//! The provider bills per request against a monthly quota. The guard keeps a
//! token bucket sized to that quota and refuses calls once it is empty,
//! without touching the network.

use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use tracing::warn;

use fx_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot};

/// Wraps a provider with a token bucket of `calls` per `period`.
pub struct QuotaGuard<P: RateProvider> {
    inner: P,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl<P: RateProvider> QuotaGuard<P> {
    /// Creates a guard allowing a burst of `calls`, replenished evenly over
    /// `period`.
    ///
    /// # Arguments
    /// * `calls` - Number of provider calls allowed per period
    /// * `period` - Time period for the quota
    pub fn new(inner: P, calls: u32, period: Duration) -> Result<Self, ProviderError> {
        let burst = NonZeroU32::new(calls)
            .ok_or_else(|| ProviderError::Provider("provider quota must be positive".into()))?;
        let quota = Quota::with_period(period / calls)
            .ok_or_else(|| ProviderError::Provider("provider quota period too short".into()))?
            .allow_burst(burst);

        Ok(Self {
            inner,
            limiter: RateLimiter::direct(quota),
        })
    }

    /// Returns a reference to the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: RateProvider> RateProvider for QuotaGuard<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        if self.limiter.check().is_err() {
            warn!(provider = self.inner.name(), base = %base, "Local provider quota exhausted");
            return Err(ProviderError::RateLimited(format!(
                "local quota for {} exhausted",
                self.inner.name()
            )));
        }
        self.inner.fetch(base).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubRateProvider;

    #[tokio::test]
    async fn test_allows_calls_within_budget() {
        let guard = QuotaGuard::new(StubRateProvider::new(), 3, Duration::from_secs(3600)).unwrap();

        for _ in 0..3 {
            assert!(guard.fetch(&CurrencyCode::usd()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_refuses_calls_over_budget() {
        let guard = QuotaGuard::new(StubRateProvider::new(), 2, Duration::from_secs(3600)).unwrap();

        guard.fetch(&CurrencyCode::usd()).await.unwrap();
        guard.fetch(&CurrencyCode::usd()).await.unwrap();

        let result = guard.fetch(&CurrencyCode::usd()).await;
        assert!(matches!(result, Err(ProviderError::RateLimited(_))));
    }

    #[test]
    fn test_zero_quota_rejected() {
        let result = QuotaGuard::new(StubRateProvider::new(), 0, Duration::from_secs(60));
        assert!(result.is_err());
    }

    #[test]
    fn test_name_passes_through() {
        let guard = QuotaGuard::new(StubRateProvider::new(), 1, Duration::from_secs(60)).unwrap();
        assert_eq!(guard.name(), "stub");
    }
}
