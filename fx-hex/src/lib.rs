//! # FX Hex
//!
//! Application layer and HTTP adapter for the exchange-rate cache.
//!
//! ## Architecture
//!
//! - `freshness` - TTL classification, stale and cleanup passes
//! - `service` - Rate resolution engine (cache, fetch, triangulate, fallback)
//! - `refresh` - Batch refresh job
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `S: RateStore` and `P: RateProvider`, so the
//! store and provider adapters are injected by the binary.

pub mod freshness;
pub mod inbound;
pub mod openapi;
pub mod refresh;
pub mod service;


pub use freshness::FreshnessPolicy;
pub use refresh::RefreshJob;
pub use service::{RateService, RateServiceConfig, ResolvedRate};
