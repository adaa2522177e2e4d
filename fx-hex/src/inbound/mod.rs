//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the rate service.

mod auth;
pub(crate) mod handlers;
mod server;

pub use server::HttpServer;
