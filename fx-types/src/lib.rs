//! # FX Types
//!
//! Domain types and port traits for the exchange-rate cache service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (CurrencyCode, RateEntry, RateSource)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AMOUNT_SCALE, CurrencyCode, Freshness, RATE_SCALE, RateEntry, RateSource, round_amount,
    round_rate,
};
pub use dto::*;
pub use error::{AppError, DomainError, RateError, RepoError};
pub use ports::{ProviderError, RateProvider, RateSnapshot, RateStore};
