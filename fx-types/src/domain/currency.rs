//! ISO 4217 currency codes.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// A validated ISO 4217 currency code (three uppercase ASCII letters).
///
/// Construction normalizes case, so `"eur"` and `"EUR"` produce the same code.
/// Malformed input is rejected with [`DomainError::InvalidCurrencyPair`]
/// before any lookup or provider call can happen.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "USD")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses and normalizes a currency code.
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.len() != 3 || !normalized.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(DomainError::InvalidCurrencyPair(format!(
                "malformed currency code: {:?}",
                code
            )));
        }
        Ok(Self(normalized))
    }

    /// US dollar, the provider's natural base.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let code: CurrencyCode = "eur".parse().unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert_eq!(code, CurrencyCode::new(" EUR ").unwrap());
    }

    #[test]
    fn test_rejects_malformed_codes() {
        for bad in ["", "US", "USDT", "U5D", "€UR", "12"] {
            assert!(
                matches!(CurrencyCode::new(bad), Err(DomainError::InvalidCurrencyPair(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let code: CurrencyCode = serde_json::from_str("\"uah\"").unwrap();
        assert_eq!(code.to_string(), "UAH");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"UAH\"");
        assert!(serde_json::from_str::<CurrencyCode>("\"dollars\"").is_err());
    }
}
