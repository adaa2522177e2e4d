//! Exchange Rate Provider Adapters
//!
//! Outbound adapters implementing the [`fx_types::RateProvider`] port:
//!
//! - [`HttpRateProvider`] - talks to an exchangerate-api style `latest` endpoint
//! - [`StubRateProvider`] - fixed USD-based table for development and seeding
//! - [`QuotaGuard`] - wraps any provider with a local call budget
//!
//! None of them retry. A failed call is reported once and the caller decides
//! whether to fall back.
//!
//! # Example
//! ```ignore
//! use exchange_rates::{HttpRateProvider, HttpProviderConfig, QuotaGuard};
//!
//! let http = HttpRateProvider::new(HttpProviderConfig::default())?;
//! let provider = QuotaGuard::new(http, 1500, Duration::from_secs(30 * 24 * 3600))?;
//! let snapshot = provider.fetch(&CurrencyCode::usd()).await?;
//! ```

mod http;
mod quota;
mod stub;

pub use http::{DEFAULT_BASE_URL, HttpProviderConfig, HttpRateProvider};
pub use quota::QuotaGuard;
pub use stub::StubRateProvider;
