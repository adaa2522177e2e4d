//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod provider;
mod store;

pub use provider::{ProviderError, RateProvider, RateSnapshot};
pub use store::RateStore;
