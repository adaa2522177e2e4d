//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::CurrencyCode;

// ─────────────────────────────────────────────────────────────────────────────
// Rate DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// How a rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Same currency on both sides
    Identity,
    /// Fresh cached entry
    Cached,
    /// Fetched from the provider in this request
    Fetched,
    /// Provider unavailable, served an expired entry
    StaleFallback,
}

/// Resolved rate for a currency pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateResponse {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Units of `to` per one unit of `from`
    #[schema(example = "49.411765")]
    pub rate: Decimal,
    pub resolution: Resolution,
}

/// Request to set an operator override rate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManualRateRequest {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    #[schema(example = "41.25")]
    pub rate: Decimal,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversion DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to convert an amount between currencies.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// Amount in `from` currency, up to two fractional digits
    #[schema(example = "100.00")]
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

/// Converted amount together with the rate actually applied.
///
/// Callers persist `rate` alongside the transaction it was used for.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertResponse {
    #[schema(example = "100.00")]
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    #[schema(example = "4941.18")]
    pub converted_amount: Decimal,
    #[schema(example = "49.411765")]
    pub rate: Decimal,
    pub resolution: Resolution,
}

// ─────────────────────────────────────────────────────────────────────────────
// Batch refresh DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one batch refresh run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Active currencies considered, pivot excluded
    pub active_currencies: usize,
    /// Direct+inverse pairs written
    pub pairs_refreshed: usize,
    /// Currencies or pairs that could not be refreshed
    pub failures: usize,
    /// Rows newly flagged stale
    pub stale_marked: u64,
    /// Rows removed by retention cleanup
    pub cleaned_up: u64,
    pub cleanup_ran: bool,
    pub elapsed_ms: u64,
}
