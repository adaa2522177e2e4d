//! Exchange rate provider port.
//!
//! This trait defines the interface for external rate sources.
//! Implementations can be HTTP clients, stub tables, quota wrappers, etc.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::CurrencyCode;

/// Error type for provider calls.
///
/// All variants are non-fatal to callers of the resolution engine: each one
/// triggers the stale-rate fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Timeout or connection failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success status or a body that does not match the expected shape.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider-side or local quota exhausted.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
}

/// All rates quoted by the provider against one base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base: CurrencyCode,
    pub as_of_date: NaiveDate,
    /// Units of each currency per one unit of `base`
    pub rates: HashMap<CurrencyCode, Decimal>,
}

impl RateSnapshot {
    /// Rate from `base` to `code`, `1` for the base itself.
    pub fn rate_for(&self, code: &CurrencyCode) -> Option<Decimal> {
        if *code == self.base {
            return Some(Decimal::ONE);
        }
        self.rates.get(code).copied()
    }
}

/// Port trait for exchange rate providers.
///
/// Implementations must not retry internally; retry policy belongs to the caller.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Identifier recorded on `API` rows.
    fn name(&self) -> &str;

    /// Fetches the latest rates relative to `base`.
    async fn fetch(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError>;
}
