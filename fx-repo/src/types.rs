//! Database row types and conversions for SQLite and PostgreSQL.
//!
//! SQLite stores decimals, dates and timestamps as TEXT. Timestamps use a
//! fixed-width RFC 3339 form (microseconds, `Z` suffix) so that string
//! comparison in SQL matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;

use fx_types::{CurrencyCode, RateEntry, RateSource, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Rate row from SQLite.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct DbRateEntry {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub as_of_date: String,
    pub source: String,
    pub api_provider: Option<String>,
    pub fetched_at: String,
    pub expires_at: String,
    pub is_stale: i64,
    pub fetch_error_count: i32,
}

/// Rate row from PostgreSQL.
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgRateEntry {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: rust_decimal::Decimal,
    pub as_of_date: chrono::NaiveDate,
    pub source: String,
    pub api_provider: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_stale: bool,
    pub fetch_error_count: i32,
}

/// Currency-only row for queries.
#[derive(FromRow)]
pub struct DbCurrency {
    pub currency: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(s: &str) -> Result<CurrencyCode, RepoError> {
    CurrencyCode::new(s).map_err(|e| RepoError::Database(e.to_string()))
}

pub fn parse_source(s: &str) -> Result<RateSource, RepoError> {
    RateSource::from_str(s).map_err(|e| RepoError::Database(e.to_string()))
}

/// Formats a timestamp for TEXT columns.
#[cfg(feature = "sqlite")]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(feature = "sqlite")]
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::Database(e.to_string()))
}

/// Collapses a currency column into sorted, distinct, valid codes.
///
/// Rows owned by other parts of the product may hold unexpected values; they
/// are skipped rather than failing the caller.
pub fn distinct_currencies(rows: Vec<DbCurrency>) -> Vec<CurrencyCode> {
    let mut codes: Vec<CurrencyCode> = rows
        .into_iter()
        .filter_map(|row| match CurrencyCode::new(&row.currency) {
            Ok(code) => Some(code),
            Err(e) => {
                tracing::warn!(currency = %row.currency, error = %e, "Skipping malformed payment method currency");
                None
            }
        })
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
impl DbRateEntry {
    /// Convert database row to domain RateEntry.
    pub fn into_domain(self) -> Result<RateEntry, RepoError> {
        let rate = rust_decimal::Decimal::from_str(&self.rate)
            .map_err(|e| RepoError::Database(format!("invalid rate {:?}: {}", self.rate, e)))?;
        let as_of_date = chrono::NaiveDate::from_str(&self.as_of_date)
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(RateEntry {
            from_currency: parse_currency(&self.from_currency)?,
            to_currency: parse_currency(&self.to_currency)?,
            rate,
            as_of_date,
            source: parse_source(&self.source)?,
            api_provider: self.api_provider,
            fetched_at: parse_timestamp(&self.fetched_at)?,
            expires_at: parse_timestamp(&self.expires_at)?,
            is_stale: self.is_stale != 0,
            fetch_error_count: self.fetch_error_count,
        })
    }
}

#[cfg(feature = "postgres")]
impl PgRateEntry {
    /// Convert database row to domain RateEntry.
    pub fn into_domain(self) -> Result<RateEntry, RepoError> {
        Ok(RateEntry {
            from_currency: parse_currency(&self.from_currency)?,
            to_currency: parse_currency(&self.to_currency)?,
            rate: self.rate,
            as_of_date: self.as_of_date,
            source: parse_source(&self.source)?,
            api_provider: self.api_provider,
            fetched_at: self.fetched_at,
            expires_at: self.expires_at,
            is_stale: self.is_stale,
            fetch_error_count: self.fetch_error_count,
        })
    }
}
