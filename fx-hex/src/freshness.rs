//! Freshness rules for cached rates.
//!
//! Classification is pure. The two passes are thin wrappers that push the
//! same rules down to the store as set-based updates.

use chrono::{DateTime, Duration, Utc};

use fx_types::{DomainError, Freshness, RateEntry, RateStore, RepoError};

/// TTL and retention horizon applied to every cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    ttl: Duration,
    retention: Duration,
}

impl FreshnessPolicy {
    /// Builds a policy.
    ///
    /// # Errors
    /// `ValidationError` unless `0 < ttl < retention`.
    pub fn new(ttl: Duration, retention: Duration) -> Result<Self, DomainError> {
        if ttl <= Duration::zero() {
            return Err(DomainError::ValidationError(
                "cache TTL must be positive".into(),
            ));
        }
        if retention <= ttl {
            return Err(DomainError::ValidationError(format!(
                "retention ({}h) must be longer than the cache TTL ({}h)",
                retention.num_hours(),
                ttl.num_hours()
            )));
        }
        Ok(Self { ttl, retention })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Classifies a lookup result at `now`. The stored stale flag is ignored.
    pub fn classify(&self, entry: Option<&RateEntry>, now: DateTime<Utc>) -> Freshness {
        match entry {
            None => Freshness::Missing,
            Some(e) if e.is_expired(now) => Freshness::Stale,
            Some(_) => Freshness::Fresh,
        }
    }

    /// Oldest `fetched_at` that survives cleanup at `now`.
    pub fn cleanup_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.retention
    }

    /// Flags every expired entry as stale. Returns rows newly flagged.
    pub async fn stale_pass<S: RateStore + ?Sized>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        store.mark_stale(now).await
    }

    /// Deletes entries older than the retention horizon. Returns rows deleted.
    pub async fn cleanup_pass<S: RateStore + ?Sized>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<u64, RepoError> {
        store.cleanup(self.cleanup_cutoff(now)).await
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            retention: Duration::days(90),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use fx_types::{CurrencyCode, RateSource};
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
    }

    fn entry() -> RateEntry {
        RateEntry::new(
            CurrencyCode::usd(),
            CurrencyCode::new("EUR").unwrap(),
            dec!(0.85),
            RateSource::Api,
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            t0(),
            Duration::hours(24),
        )
        .unwrap()
    }

    #[test]
    fn test_classify_boundary() {
        let policy = FreshnessPolicy::default();
        let e = entry();

        assert_eq!(policy.classify(None, t0()), Freshness::Missing);
        assert_eq!(policy.classify(Some(&e), t0()), Freshness::Fresh);
        assert_eq!(
            policy.classify(Some(&e), t0() + Duration::hours(24) - Duration::microseconds(1)),
            Freshness::Fresh
        );
        assert_eq!(
            policy.classify(Some(&e), t0() + Duration::hours(24)),
            Freshness::Stale
        );
    }

    #[test]
    fn test_classify_ignores_stale_flag() {
        let policy = FreshnessPolicy::default();
        let mut e = entry();
        e.is_stale = true;

        assert_eq!(policy.classify(Some(&e), t0()), Freshness::Fresh);
    }

    #[test]
    fn test_retention_must_exceed_ttl() {
        assert!(FreshnessPolicy::new(Duration::hours(24), Duration::hours(24)).is_err());
        assert!(FreshnessPolicy::new(Duration::zero(), Duration::days(1)).is_err());
        assert!(FreshnessPolicy::new(Duration::hours(24), Duration::days(90)).is_ok());
    }

    #[test]
    fn test_cleanup_cutoff() {
        let policy = FreshnessPolicy::new(Duration::hours(6), Duration::days(7)).unwrap();
        assert_eq!(policy.cleanup_cutoff(t0()), t0() - Duration::days(7));
    }
}
