//! Cached exchange-rate entries.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::currency::CurrencyCode;
use crate::error::DomainError;

/// Fractional digits kept for every stored rate.
pub const RATE_SCALE: u32 = 6;

/// Fractional digits of converted monetary amounts.
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds a rate to [`RATE_SCALE`] digits, midpoint to even.
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds an amount to [`AMOUNT_SCALE`] digits, midpoint to even.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Provenance of a cached rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RateSource {
    /// Seed data shipped with the service.
    Stub,
    /// Operator override.
    Manual,
    /// Fetched directly from the rate provider.
    Api,
    /// Derived by inversion or triangulation.
    System,
}

impl RateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateSource::Stub => "STUB",
            RateSource::Manual => "MANUAL",
            RateSource::Api => "API",
            RateSource::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RateSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STUB" => Ok(RateSource::Stub),
            "MANUAL" => Ok(RateSource::Manual),
            "API" => Ok(RateSource::Api),
            "SYSTEM" => Ok(RateSource::System),
            other => Err(DomainError::ValidationError(format!(
                "Unknown rate source: {}",
                other
            ))),
        }
    }
}

/// Usability of a stored rate at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Within TTL, serve as-is.
    Fresh,
    /// Past TTL, only a fallback of last resort.
    Stale,
    /// Never populated.
    Missing,
}

/// One cached conversion rate for an ordered currency pair.
///
/// Identity pairs are never stored and `rate` is always positive with
/// [`RATE_SCALE`] fractional digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RateEntry {
    pub from_currency: CurrencyCode,
    pub to_currency: CurrencyCode,
    /// Units of `to_currency` per one unit of `from_currency`
    #[schema(example = "0.850000")]
    pub rate: Decimal,
    /// Date of the snapshot the rate belongs to
    pub as_of_date: NaiveDate,
    pub source: RateSource,
    /// Provider identifier, only set for `API` rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_stale: bool,
    /// Consecutive failed refresh attempts
    pub fetch_error_count: i32,
}

impl RateEntry {
    /// Builds a fresh entry, fetched at `fetched_at` and valid for `ttl`.
    ///
    /// # Validation
    /// - `from` and `to` must differ
    /// - `rate` must stay positive after rounding to [`RATE_SCALE`] digits
    pub fn new(
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
        source: RateSource,
        as_of_date: NaiveDate,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self, DomainError> {
        if from == to {
            return Err(DomainError::InvalidCurrencyPair(format!(
                "identity pair {}/{} is never stored",
                from, to
            )));
        }

        let rate = round_rate(rate);
        if rate <= Decimal::ZERO {
            return Err(DomainError::NonPositiveRate {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        Ok(Self {
            from_currency: from,
            to_currency: to,
            rate,
            as_of_date,
            source,
            api_provider: None,
            fetched_at,
            expires_at: fetched_at + ttl,
            is_stale: false,
            fetch_error_count: 0,
        })
    }

    /// Tags the entry with the provider that produced it. Ignored unless the
    /// source is `API`.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        if self.source == RateSource::Api {
            self.api_provider = Some(provider.into());
        }
        self
    }

    /// Derives the reverse-direction entry (`1 / rate`), tagged `SYSTEM`.
    pub fn inverse(&self) -> Result<Self, DomainError> {
        let rate = Decimal::ONE
            .checked_div(self.rate)
            .ok_or_else(|| DomainError::NonPositiveRate {
                from: self.to_currency.to_string(),
                to: self.from_currency.to_string(),
            })?;

        let mut inverse = Self::new(
            self.to_currency.clone(),
            self.from_currency.clone(),
            rate,
            RateSource::System,
            self.as_of_date,
            self.fetched_at,
            Duration::zero(),
        )?;
        inverse.expires_at = self.expires_at;
        Ok(inverse)
    }

    /// True once the entry's TTL has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
