//! Shared-secret middleware for the batch job endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use fx_repo::security::verify_shared_secret;
use fx_types::{AppError, RateProvider, RateStore};

use super::handlers::{ApiError, AppState};

/// Extracts the token from the Authorization header.
/// Expected format: "Bearer <secret>"
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    auth_header?.strip_prefix("Bearer ").map(str::trim)
}

/// Rejects any request whose bearer token does not match `CRON_SECRET`.
pub async fn cron_auth_middleware<S: RateStore, P: RateProvider>(
    State(state): State<Arc<AppState<S, P>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match extract_bearer(auth_header) {
        Some(token) if verify_shared_secret(token, &state.cron_secret) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected batch job call with wrong secret");
            unauthorized_response("Invalid cron secret")
        }
        None => unauthorized_response("Missing or invalid Authorization header"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    ApiError(AppError::Unauthorized(message.to_string())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer s3cret")), Some("s3cret"));
    }

    #[test]
    fn test_extract_bearer_requires_scheme() {
        assert_eq!(extract_bearer(Some("s3cret")), None);
        assert_eq!(extract_bearer(Some("Basic s3cret")), None);
    }

    #[test]
    fn test_extract_bearer_none() {
        assert_eq!(extract_bearer(None), None);
    }

    #[tokio::test]
    async fn test_unauthorized_response_body() {
        let response = unauthorized_response("Invalid cron secret");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 401);
        assert_eq!(json["error"], "Invalid cron secret");
    }
}
