//! Client example demonstrating rate lookups, overrides and conversion
//! against a running server backed by the stub provider.
//!
//! Run with: cargo run -p fx-app --example client_example

use std::net::SocketAddr;
use std::sync::Arc;

use exchange_rates::StubRateProvider;
use fx_client::FxClient;
use fx_hex::{RateService, RateServiceConfig, inbound::HttpServer};
use fx_repo::build_repo;
use fx_types::CurrencyCode;
use rust_decimal_macros::dec;
use tempfile::tempdir;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("fx.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&db_url).await?);

    // Start server in background
    let service = Arc::new(RateService::new(
        repo,
        StubRateProvider::new(),
        RateServiceConfig::default(),
    )?);
    let server = HttpServer::new(service, "example-secret");
    let router = server.router();

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        axum::serve(
            TcpListener::bind(&server_addr).await.unwrap(),
            router.into_make_service(),
        )
        .await
        .unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    let client = FxClient::new(format!("http://127.0.0.1:{port}"));
    let usd = CurrencyCode::usd();
    let eur = CurrencyCode::new("EUR")?;
    let uah = CurrencyCode::new("UAH")?;

    // Health check
    let health = client.health().await?;
    println!("✅ Server health: {health}");

    // First lookup goes to the provider, second is served from the cache
    let first = client.get_rate(&eur, &uah).await?;
    println!("✅ EUR/UAH = {} ({:?})", first.rate, first.resolution);
    let second = client.get_rate(&eur, &uah).await?;
    println!("✅ EUR/UAH = {} ({:?})", second.rate, second.resolution);

    // Unknown currency
    let xau = CurrencyCode::new("XAU")?;
    let response = client.get_rate(&usd, &xau).await;
    assert!(response.is_err());
    println!("✅ USD/XAU unavailable: {}", response.unwrap_err());

    // Operator override, inverse written alongside
    let manual = client.set_manual_rate(usd.clone(), xau.clone(), dec!(0.00042)).await?;
    println!("✅ Manual USD/XAU = {} ({})", manual.rate, manual.source);
    let inverse = client.get_rate(&xau, &usd).await?;
    println!("   XAU/USD = {}", inverse.rate);

    // Conversion
    let converted = client.convert(dec!(250.00), eur.clone(), usd.clone()).await?;
    println!(
        "✅ {} {} = {} {} at {}",
        converted.amount, converted.from, converted.converted_amount, converted.to, converted.rate
    );

    // Batch job without the secret is refused
    let refused = client.refresh().await;
    assert!(refused.is_err());
    println!("✅ Refresh without secret: {}", refused.unwrap_err());

    let summary = client.with_cron_secret("example-secret").refresh().await?;
    println!(
        "✅ Refresh run {}: {} pairs, {} failures",
        summary.run_id, summary.pairs_refreshed, summary.failures
    );

    // List all cached rates
    let rates = FxClient::new(format!("http://127.0.0.1:{port}"))
        .list_rates()
        .await?;
    println!("\n📋 Cached rates:");
    for rate in rates {
        println!(
            "   - {}/{} = {} [{}]",
            rate.from_currency, rate.to_currency, rate.rate, rate.source
        );
    }

    println!("\n🎉 Example completed successfully!");

    Ok(())
}
