//! Rate store port trait.
//!
//! This is the primary persistence port of the service.
//! Adapters (Postgres, SQLite, in-memory) implement this trait.

use chrono::{DateTime, Utc};

use crate::domain::{CurrencyCode, RateEntry};
use crate::error::RepoError;

/// Persistence for cached rate entries.
///
/// At most one row exists per ordered `(from, to)` pair; every write is an
/// upsert.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync + 'static {
    /// Gets the entry for a pair, regardless of freshness.
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<RateEntry>, RepoError>;

    /// Inserts or replaces a single entry.
    async fn upsert_rate(&self, entry: &RateEntry) -> Result<(), RepoError>;

    /// Inserts or replaces a direct entry and its inverse.
    ///
    /// MUST be atomic: both rows are written or neither is.
    async fn upsert_rate_pair(
        &self,
        direct: &RateEntry,
        inverse: &RateEntry,
    ) -> Result<(), RepoError>;

    /// Flags every expired, not-yet-flagged entry as stale. Returns the number
    /// of rows flagged.
    async fn mark_stale(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;

    /// Deletes entries fetched before `cutoff`. Returns the number of rows
    /// deleted.
    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError>;

    /// Increments the failure counter on a pair and its inverse. Returns the
    /// number of rows touched.
    async fn record_fetch_failure(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<u64, RepoError>;

    /// Distinct currencies referenced by at least one active payment method.
    async fn list_active_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError>;

    /// Lists all cached entries ordered by pair.
    async fn list_rates(&self) -> Result<Vec<RateEntry>, RepoError>;
}
