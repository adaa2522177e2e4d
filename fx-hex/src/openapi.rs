//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use fx_types::domain::{CurrencyCode, RateEntry, RateSource};
use fx_types::dto::{
    ConvertRequest, ConvertResponse, ManualRateRequest, RateResponse, RefreshSummary, Resolution,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

use crate::inbound::handlers::HealthResponse;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
async fn health() {}

/// List every cached rate
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "rates",
    responses(
        (status = 200, description = "Cached rates ordered by pair", body = Vec<RateEntry>),
        (status = 500, description = "Store failure")
    )
)]
async fn list_rates() {}

/// Resolve the rate for a currency pair
#[utoipa::path(
    get,
    path = "/api/rates/{from}/{to}",
    tag = "rates",
    params(
        ("from" = String, Path, description = "Source currency (ISO 4217)", example = "EUR"),
        ("to" = String, Path, description = "Target currency (ISO 4217)", example = "UAH")
    ),
    responses(
        (status = 200, description = "Resolved rate", body = RateResponse),
        (status = 400, description = "Malformed currency code"),
        (status = 503, description = "No rate available; set a manual rate")
    )
)]
async fn get_rate() {}

/// Store an operator override rate
#[utoipa::path(
    post,
    path = "/api/rates/manual",
    tag = "rates",
    request_body = ManualRateRequest,
    responses(
        (status = 201, description = "Override stored with its inverse", body = RateEntry),
        (status = 400, description = "Invalid pair or non-positive rate")
    )
)]
async fn set_manual_rate() {}

/// Convert an amount between currencies
#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "conversion",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Converted amount and the rate applied", body = ConvertResponse),
        (status = 400, description = "Invalid request"),
        (status = 503, description = "No rate available; set a manual rate")
    )
)]
async fn convert() {}

/// Run the batch refresh job
#[utoipa::path(
    post,
    path = "/api/jobs/refresh-rates",
    tag = "jobs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Run summary", body = RefreshSummary),
        (status = 401, description = "Missing or wrong cron secret")
    )
)]
async fn refresh_rates() {}

/// OpenAPI documentation for the exchange-rate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Exchange Rate Cache API",
        version = "1.0.0",
        description = "Cached currency conversion rates backed by an external provider.\n\n## Authentication\n\nOnly the batch job endpoint is protected. Send the configured cron secret as a bearer token:\n\n```\nAuthorization: Bearer <CRON_SECRET>\n```",
        license(name = "MIT"),
    ),
    paths(
        health,
        list_rates,
        get_rate,
        set_manual_rate,
        convert,
        refresh_rates,
    ),
    components(
        schemas(
            HealthResponse,
            CurrencyCode,
            RateEntry,
            RateSource,
            Resolution,
            RateResponse,
            ManualRateRequest,
            ConvertRequest,
            ConvertResponse,
            RefreshSummary,
        )
    ),

    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Rate lookup and overrides"),
        (name = "conversion", description = "Amount conversion"),
        (name = "jobs", description = "Scheduled batch refresh"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
