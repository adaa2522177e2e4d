//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use fx_types::{
    AppError, ConvertRequest, CurrencyCode, DomainError, ManualRateRequest, RateError,
    RateProvider, RateResponse, RateStore, RepoError,
};

use crate::openapi::ApiDoc;
use crate::{RateService, RefreshJob};

/// Application state shared across handlers.
pub struct AppState<S: RateStore, P: RateProvider> {
    pub service: Arc<RateService<S, P>>,
    pub job: Arc<RefreshJob<S, P>>,
    pub cron_secret: String,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<RateError> for ApiError {
    fn from(err: RateError) -> Self {
        ApiError(err.into())
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        ApiError(err.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::RateUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} via POST /api/rates/manual", msg),
            ),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_code(raw: &str) -> Result<CurrencyCode, ApiError> {
    CurrencyCode::new(raw).map_err(ApiError::from)
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()).into())
}

/// Liveness plus the stale-fallback counter.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    /// Expired rates served since startup because the provider failed
    pub stale_rate_usages: u64,
}

/// Health check endpoint.
pub async fn health<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        stale_rate_usages: state.service.stale_usage_count(),
    })
}

/// OpenAPI document.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// List every cached rate.
#[tracing::instrument(skip(state))]
pub async fn list_rates<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state.service.store().list_rates().await?;
    Ok(Json(rates))
}

/// Resolve the rate for a pair.
#[tracing::instrument(skip(state))]
pub async fn get_rate<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
    Path((from, to)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let from = parse_code(&from)?;
    let to = parse_code(&to)?;

    let resolved = state.service.get_rate(&from, &to).await?;
    Ok(Json(RateResponse {
        from,
        to,
        rate: resolved.rate,
        resolution: resolved.resolution,
    }))
}

/// Store an operator override.
#[tracing::instrument(skip_all)]
pub async fn set_manual_rate<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
    payload: Result<Json<ManualRateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(payload)?;
    let entry = state
        .service
        .set_manual_rate(&req.from, &req.to, req.rate)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Convert an amount between currencies.
#[tracing::instrument(skip_all)]
pub async fn convert<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(payload)?;
    let converted = state
        .service
        .convert(req.amount, &req.from, &req.to)
        .await?;
    Ok(Json(converted))
}

/// Run the batch refresh job. Authenticated by the cron secret middleware.
#[tracing::instrument(skip(state))]
pub async fn refresh_rates<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
) -> impl IntoResponse {
    Json(state.job.run().await)
}
