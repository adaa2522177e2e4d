//! Integration tests for the HTTP adapter.
//!
//! Drives the full router against an in-memory SQLite store and the stub
//! provider.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use exchange_rates::StubRateProvider;
use fx_hex::{RateService, RateServiceConfig, inbound::HttpServer};
use fx_repo::SqliteRateStore;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tower::ServiceExt;

const CRON_SECRET: &str = "test-cron-secret";

/// Helper to create a router over a fresh in-memory store.
async fn create_test_app() -> (Router, Arc<SqliteRateStore>) {
    let store = Arc::new(SqliteRateStore::new("sqlite::memory:").await.unwrap());
    let service = RateService::new(
        store.clone(),
        StubRateProvider::new(),
        RateServiceConfig::default(),
    )
    .unwrap();
    let server = HttpServer::new(Arc::new(service), CRON_SECRET);
    (server.router(), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn refresh_request(secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/jobs/refresh-rates");
    if let Some(secret) = secret {
        builder = builder.header("Authorization", format!("Bearer {}", secret));
    }
    builder.body(Body::empty()).unwrap()
}

fn decimal(value: &serde_json::Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["stale_rate_usages"], 0);
}

#[tokio::test]
async fn test_get_rate_fetches_then_caches() {
    let (app, _) = create_test_app().await;

    let response = app.clone().oneshot(get("/api/rates/USD/EUR")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(decimal(&json["rate"]), dec!(0.92));
    assert_eq!(json["resolution"], "fetched");

    let response = app.oneshot(get("/api/rates/usd/eur")).await.unwrap();
    let json = json_body(response).await;
    assert_eq!(json["resolution"], "cached");
    assert_eq!(json["from"], "USD");
}

#[tokio::test]
async fn test_malformed_code_is_bad_request() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("/api/rates/US/EUR")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn test_unknown_currency_is_unavailable() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("/api/rates/USD/XAU")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["code"], 503);
    assert!(json["error"].as_str().unwrap().contains("/api/rates/manual"));
}

#[tokio::test]
async fn test_convert() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/convert",
            r#"{"amount": "100", "from": "EUR", "to": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(decimal(&json["rate"]), dec!(1.086957));
    assert_eq!(decimal(&json["converted_amount"]), dec!(108.70));
}

#[tokio::test]
async fn test_convert_rejects_bad_body() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/convert",
            r#"{"amount": "100", "from": "EURO", "to": "USD"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_rate_then_list() {
    let (app, _) = create_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/rates/manual",
            r#"{"from": "USD", "to": "UAH", "rate": "41.25"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = json_body(response).await;
    assert_eq!(json["source"], "MANUAL");

    let response = app.oneshot(get("/api/rates")).await.unwrap();
    let json = json_body(response).await;
    let rates = json.as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert_eq!(rates[0]["from_currency"], "UAH");
    assert_eq!(rates[0]["source"], "SYSTEM");
}

#[tokio::test]
async fn test_manual_rate_rejects_non_positive() {
    let (app, _) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/rates/manual",
            r#"{"from": "USD", "to": "UAH", "rate": "-1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_requires_secret() {
    let (app, _) = create_test_app().await;

    let missing = app.clone().oneshot(refresh_request(None)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(missing).await;
    assert_eq!(json["code"], 401);

    let wrong = app
        .oneshot(refresh_request(Some("not-the-secret")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_returns_summary() {
    let (app, store) = create_test_app().await;
    for (id, currency) in [("pm-1", "EUR"), ("pm-2", "UAH")] {
        sqlx::query(
            "INSERT INTO payment_methods (id, name, currency, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(id)
        .bind("card")
        .bind(currency)
        .bind("2026-10-01T09:00:00.000000Z")
        .execute(store.pool())
        .await
        .unwrap();
    }

    let response = app.oneshot(refresh_request(Some(CRON_SECRET))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["run_id"].is_string());
    assert_eq!(json["active_currencies"], 2);
    assert_eq!(json["pairs_refreshed"], 3);
    assert_eq!(json["failures"], 0);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _) = create_test_app().await;

    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/api/convert"].is_object());
}
