//! Error types for the exchange-rate service.

use crate::domain::CurrencyCode;

/// Domain-level errors (business rule violations).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid currency pair: {0}")]
    InvalidCurrencyPair(String),

    #[error("Rate for {from}/{to} must be positive")]
    NonPositiveRate { from: String, to: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}

/// Errors surfaced by the rate resolution engine to its callers.
///
/// Provider failures never appear here: they are absorbed and turned into a
/// fallback attempt.
#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("No exchange rate available for {from} -> {to}; enter a manual rate")]
    RateUnavailable { from: CurrencyCode, to: CurrencyCode },

    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate unavailable: {0}")]
    RateUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => AppError::BadRequest(e.to_string()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
        }
    }
}

impl From<RateError> for AppError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::Domain(e) => e.into(),
            e @ RateError::RateUnavailable { .. } => AppError::RateUnavailable(e.to_string()),
            RateError::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_unavailable_maps_to_app_error() {
        let err = RateError::RateUnavailable {
            from: CurrencyCode::new("EUR").unwrap(),
            to: CurrencyCode::new("UAH").unwrap(),
        };
        match AppError::from(err) {
            AppError::RateUnavailable(msg) => {
                assert!(msg.contains("EUR -> UAH"));
                assert!(msg.contains("manual rate"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_pair_is_bad_request() {
        let err = RateError::Domain(DomainError::InvalidCurrencyPair("bad".into()));
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[test]
    fn test_store_failure_is_internal() {
        let err = RateError::Store(RepoError::Database("disk full".into()));
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }
}
