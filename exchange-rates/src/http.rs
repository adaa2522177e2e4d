//! HTTP client for exchangerate-api style `latest` endpoints.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use fx_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot};

/// Public endpoint of exchangerate-api v6.
pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

/// Settings for [`HttpRateProvider`].
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: String,
    /// Sent as a path segment before `/latest`
    pub api_key: Option<String>,
    /// Upper bound for one request, connect included
    pub timeout: Duration,
    /// Recorded as `api_provider` on fetched rows
    pub name: String,
}

impl Default for HttpProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
            name: "exchangerate-api".to_string(),
        }
    }
}

/// Expected response body. Anything that does not match one of the two
/// shapes is rejected as a provider error.
#[derive(Debug, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
enum LatestResponse {
    Success {
        base_code: String,
        time_last_update_unix: i64,
        conversion_rates: HashMap<String, serde_json::Number>,
    },
    Error {
        #[serde(rename = "error-type")]
        error_type: String,
    },
}

/// Rate provider backed by a remote HTTP API.
pub struct HttpRateProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    name: String,
}

impl HttpRateProvider {
    /// Creates a provider from its settings.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.is_empty()),
            timeout: config.timeout,
            name: config.name,
        })
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{}/latest/{}", self.base_url, key, base),
            None => format!("{}/latest/{}", self.base_url, base),
        }
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        debug!(provider = %self.name, base = %base, "Fetching latest rates");

        let resp = self
            .http
            .get(self.latest_url(base))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited(format!(
                "{} answered HTTP 429",
                self.name
            )));
        }

        let body = resp.text().await.map_err(map_transport_error)?;

        let parsed: LatestResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(ProviderError::Provider(format!("HTTP {}", status)));
            }
            Err(e) => {
                return Err(ProviderError::Provider(format!("malformed response: {}", e)));
            }
        };

        match parsed {
            LatestResponse::Error { error_type } => Err(map_error_type(&error_type)),
            LatestResponse::Success { .. } if !status.is_success() => {
                Err(ProviderError::Provider(format!("HTTP {}", status)))
            }
            LatestResponse::Success {
                base_code,
                time_last_update_unix,
                conversion_rates,
            } => into_snapshot(base, &base_code, time_last_update_unix, conversion_rates),
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    // The URL may carry the API key.
    let err = err.without_url();
    if err.is_decode() {
        ProviderError::Provider(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

fn map_error_type(error_type: &str) -> ProviderError {
    match error_type {
        "quota-reached" => ProviderError::RateLimited(error_type.to_string()),
        other => ProviderError::Provider(other.to_string()),
    }
}

fn parse_rate(value: &serde_json::Number) -> Option<Decimal> {
    let text = value.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn into_snapshot(
    requested: &CurrencyCode,
    base_code: &str,
    time_last_update_unix: i64,
    conversion_rates: HashMap<String, serde_json::Number>,
) -> Result<RateSnapshot, ProviderError> {
    let base = CurrencyCode::new(base_code).map_err(|e| ProviderError::Provider(e.to_string()))?;
    if base != *requested {
        return Err(ProviderError::Provider(format!(
            "requested base {} but provider answered {}",
            requested, base
        )));
    }

    if conversion_rates.is_empty() {
        return Err(ProviderError::Provider("empty conversion_rates".into()));
    }

    let as_of_date = DateTime::from_timestamp(time_last_update_unix, 0)
        .ok_or_else(|| {
            ProviderError::Provider(format!(
                "invalid time_last_update_unix: {}",
                time_last_update_unix
            ))
        })?
        .date_naive();

    let mut rates = HashMap::with_capacity(conversion_rates.len());
    for (code, value) in conversion_rates {
        let code =
            CurrencyCode::new(&code).map_err(|e| ProviderError::Provider(e.to_string()))?;
        let rate = parse_rate(&value)
            .filter(|r| *r > Decimal::ZERO)
            .ok_or_else(|| {
                ProviderError::Provider(format!("invalid rate for {}: {}", code, value))
            })?;
        if code == base {
            continue;
        }
        rates.insert(code, rate);
    }

    Ok(RateSnapshot {
        base,
        as_of_date,
        rates,
    })
}
