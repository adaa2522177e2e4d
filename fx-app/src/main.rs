//! # Exchange Rate Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the rate store and the provider adapter
//! - Create the rate service and the batch job
//! - Start the refresh scheduler (when enabled) and the HTTP server

mod config;
mod provider;
mod scheduler;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{
    metrics::SdkMeterProvider, propagation::TraceContextPropagator, trace as sdktrace,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fx_hex::{RateService, RefreshJob, inbound::HttpServer};
use fx_repo::build_repo;

use crate::provider::Provider;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Use gRPC exporter with batch processing (non-blocking)
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("fx-service"), provider))
}

/// Installs the global meter provider read by the HTTP metrics layer.
fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .build()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    global::set_meter_provider(provider.clone());
    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize OpenTelemetry tracing and metrics
    let (otel_tracer, otel_provider) = init_tracer()?;
    let meter_provider = init_meter()?;
    let telemetry = tracing_opentelemetry::layer().with_tracer(otel_tracer);

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fx_app=debug,fx_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    // Load configuration
    let config = config::Config::from_env()?;

    tracing::info!("Starting exchange-rate server on port {}", config.port);

    // Build repository (handles connection and migration)
    let repo = Arc::new(build_repo(&config.database_url).await?);
    tracing::info!(backend = repo.backend(), "Rate store ready");

    let provider = Provider::from_config(&config)?;
    tracing::info!(provider = ?config.provider, pivot = %config.pivot, "Rate provider ready");

    let service = Arc::new(RateService::new(repo, provider, config.service_config())?);

    if config.seed_stub_rates {
        service.seed_stub_rates_at(chrono::Utc::now()).await?;
    }

    let job = Arc::new(RefreshJob::new(service.clone()));
    let scheduler = config
        .refresh_interval
        .map(|every| scheduler::spawn_refresh_loop(job.clone(), every));

    // Create and run the HTTP server
    let server = HttpServer::with_job(service, job, config.cron_secret.clone());
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }

    // Ensure traces and metrics are flushed before exit
    let _ = meter_provider.shutdown();
    let _ = otel_provider.shutdown();
    Ok(())
}
