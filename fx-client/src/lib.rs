//! # FX Client SDK
//!
//! A typed Rust client for the exchange-rate API.

use fx_types::{
    ConvertRequest, ConvertResponse, CurrencyCode, ManualRateRequest, RateEntry, RateResponse,
    RefreshSummary,
};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Exchange-rate API client.
pub struct FxClient {
    base_url: String,
    cron_secret: Option<String>,
    http: Client,
}

impl FxClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cron_secret: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer secret sent to the batch job endpoint.
    pub fn with_cron_secret(mut self, secret: impl Into<String>) -> Self {
        self.cron_secret = Some(secret.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Lists every cached rate, ordered by pair.
    pub async fn list_rates(&self) -> Result<Vec<RateEntry>, ClientError> {
        self.get("/api/rates").await
    }

    /// Resolves the rate for a pair.
    pub async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<RateResponse, ClientError> {
        self.get(&format!("/api/rates/{}/{}", from, to)).await
    }

    /// Converts an amount, returning the rate that was applied.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ConvertResponse, ClientError> {
        let req = ConvertRequest { amount, from, to };
        self.send(self.http.post(self.url("/api/convert")).json(&req))
            .await
    }

    /// Stores an operator override rate.
    pub async fn set_manual_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    ) -> Result<RateEntry, ClientError> {
        let req = ManualRateRequest { from, to, rate };
        self.send(self.http.post(self.url("/api/rates/manual")).json(&req))
            .await
    }

    /// Triggers the batch refresh job.
    pub async fn refresh(&self) -> Result<RefreshSummary, ClientError> {
        let mut req = self.http.post(self.url("/api/jobs/refresh-rates"));
        if let Some(secret) = &self.cron_secret {
            req = req.bearer_auth(secret);
        }
        self.send(req).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.http.get(self.url(path))).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fx_types::Resolution;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = FxClient::new("http://localhost:3000");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_trailing_slash() {
        let client = FxClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_client_with_cron_secret() {
        let client = FxClient::new("http://localhost:3000").with_cron_secret("s3cret");
        assert_eq!(client.cron_secret, Some("s3cret".to_string()));
    }

    #[tokio::test]
    async fn test_get_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rates/EUR/UAH"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "from": "EUR",
                "to": "UAH",
                "rate": "49.411765",
                "resolution": "cached"
            })))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri());
        let resp = client.get_rate(&code("EUR"), &code("UAH")).await.unwrap();

        assert_eq!(resp.rate, dec!(49.411765));
        assert_eq!(resp.resolution, Resolution::Cached);
    }

    #[tokio::test]
    async fn test_convert_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/convert"))
            .and(body_json(serde_json::json!({
                "amount": "100",
                "from": "EUR",
                "to": "UAH"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "amount": "100",
                "from": "EUR",
                "to": "UAH",
                "converted_amount": "4941.18",
                "rate": "49.411765",
                "resolution": "fetched"
            })))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri());
        let resp = client
            .convert(dec!(100), code("EUR"), code("UAH"))
            .await
            .unwrap();

        assert_eq!(resp.converted_amount, dec!(4941.18));
        assert_eq!(resp.resolution, Resolution::Fetched);
    }

    #[tokio::test]
    async fn test_api_error_message_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rates/USD/XAU"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": "No rate available for USD/XAU",
                "code": 503
            })))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri());
        let err = client
            .get_rate(&code("USD"), &code("XAU"))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "No rate available for USD/XAU");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/jobs/refresh-rates"))
            .and(header("Authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "run_id": "6f1c1f3e-8f3a-4c53-9a4e-0c1d2b3a4f5e",
                "started_at": "2026-10-01T09:00:00Z",
                "active_currencies": 2,
                "pairs_refreshed": 3,
                "failures": 0,
                "stale_marked": 0,
                "cleaned_up": 0,
                "cleanup_ran": true,
                "elapsed_ms": 12
            })))
            .mount(&server)
            .await;

        let client = FxClient::new(server.uri()).with_cron_secret("s3cret");
        let summary = client.refresh().await.unwrap();

        assert_eq!(summary.pairs_refreshed, 3);
        assert!(summary.cleanup_ran);
    }
}
