//! Hardcoded rates for development, testing and `STUB` seeding.
//!
//! # Adding a New Currency
//! Add a line to [`STUB_USD_RATES`] with the number of units per one US
//! dollar, in millionths:
//! ```ignore
//! ("CHF", 880_000),
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use fx_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot, round_rate};

/// Units of each currency per 1 USD, scaled by 10^6.
const STUB_USD_RATES: &[(&str, i64)] = &[
    ("EUR", 920_000),
    ("GBP", 790_000),
    ("INR", 83_120_000),
    ("UAH", 41_500_000),
    ("PLN", 3_980_000),
    ("CAD", 1_360_000),
    ("JPY", 149_500_000),
    ("CHF", 880_000),
];

/// In-process provider serving [`STUB_USD_RATES`], rebased on request.
pub struct StubRateProvider {
    usd_rates: HashMap<CurrencyCode, Decimal>,
}

impl StubRateProvider {
    pub fn new() -> Self {
        let usd_rates = STUB_USD_RATES
            .iter()
            .filter_map(|(code, micros)| {
                CurrencyCode::new(code)
                    .ok()
                    .map(|c| (c, Decimal::new(*micros, 6)))
            })
            .collect();
        Self { usd_rates }
    }

    /// Codes served by the stub, USD included.
    pub fn currencies(&self) -> Vec<CurrencyCode> {
        let mut codes: Vec<_> = self.usd_rates.keys().cloned().collect();
        codes.push(CurrencyCode::usd());
        codes.sort();
        codes
    }

    /// Builds the table relative to `base` without any I/O.
    pub fn snapshot(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        let usd = CurrencyCode::usd();
        let base_per_usd = if *base == usd {
            Decimal::ONE
        } else {
            *self.usd_rates.get(base).ok_or_else(|| {
                ProviderError::Provider(format!("stub table has no base {}", base))
            })?
        };

        let mut rates: HashMap<CurrencyCode, Decimal> = self
            .usd_rates
            .iter()
            .filter(|(code, _)| *code != base)
            .map(|(code, per_usd)| (code.clone(), round_rate(*per_usd / base_per_usd)))
            .collect();
        if *base != usd {
            rates.insert(usd, round_rate(Decimal::ONE / base_per_usd));
        }

        Ok(RateSnapshot {
            base: base.clone(),
            as_of_date: Utc::now().date_naive(),
            rates,
        })
    }
}

impl Default for StubRateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateProvider for StubRateProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        self.snapshot(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_usd_snapshot() {
        let stub = StubRateProvider::new();
        let snapshot = stub.fetch(&CurrencyCode::usd()).await.unwrap();

        assert_eq!(snapshot.rates[&code("EUR")], dec!(0.92));
        assert_eq!(snapshot.rates[&code("INR")], dec!(83.12));
        assert!(!snapshot.rates.contains_key(&CurrencyCode::usd()));
    }

    #[test]
    fn test_rebased_snapshot() {
        let stub = StubRateProvider::new();
        let snapshot = stub.snapshot(&code("EUR")).unwrap();

        assert_eq!(snapshot.rates[&CurrencyCode::usd()], dec!(1.086957));
        assert_eq!(snapshot.rates[&code("GBP")], dec!(0.858696));
        assert!(!snapshot.rates.contains_key(&code("EUR")));
    }

    #[test]
    fn test_unknown_base() {
        let stub = StubRateProvider::new();
        assert!(matches!(
            stub.snapshot(&code("XAU")),
            Err(ProviderError::Provider(_))
        ));
    }

    #[test]
    fn test_currencies_include_usd() {
        let codes = StubRateProvider::new().currencies();
        assert_eq!(codes.len(), STUB_USD_RATES.len() + 1);
        assert!(codes.contains(&CurrencyCode::usd()));
    }
}
