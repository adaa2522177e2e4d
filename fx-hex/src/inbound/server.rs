//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use fx_types::{RateProvider, RateStore};

use super::auth::cron_auth_middleware;
use super::handlers::{self, AppState};
use crate::{RateService, RefreshJob};

/// HTTP Server for the exchange-rate API.
pub struct HttpServer<S: RateStore, P: RateProvider> {
    state: Arc<AppState<S, P>>,
}

impl<S: RateStore, P: RateProvider> HttpServer<S, P> {
    /// Creates a new HTTP server around a shared service.
    ///
    /// The batch job endpoint accepts only `Authorization: Bearer <cron_secret>`.
    pub fn new(service: Arc<RateService<S, P>>, cron_secret: impl Into<String>) -> Self {
        let job = Arc::new(RefreshJob::new(service.clone()));
        Self::with_job(service, job, cron_secret)
    }

    /// Creates a server that shares an existing job (and its cleanup clock)
    /// with a scheduler.
    pub fn with_job(
        service: Arc<RateService<S, P>>,
        job: Arc<RefreshJob<S, P>>,
        cron_secret: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(AppState {
                service,
                job,
                cron_secret: cron_secret.into(),
            }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let jobs = Router::new()
            .route(
                "/api/jobs/refresh-rates",
                post(handlers::refresh_rates::<S, P>),
            )
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                cron_auth_middleware::<S, P>,
            ));

        Router::new()
            .route("/health", get(handlers::health::<S, P>))
            .route("/api-docs/openapi.json", get(handlers::openapi_json))
            .route("/api/rates", get(handlers::list_rates::<S, P>))
            .route("/api/rates/manual", post(handlers::set_manual_rate::<S, P>))
            .route("/api/rates/{from}/{to}", get(handlers::get_rate::<S, P>))
            .route("/api/convert", post(handlers::convert::<S, P>))
            .merge(jobs)
            .layer(metrics)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
