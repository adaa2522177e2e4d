//! Provider adapter selected at startup.

use async_trait::async_trait;

use exchange_rates::{HttpProviderConfig, HttpRateProvider, QuotaGuard, StubRateProvider};
use fx_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot};

use crate::config::{Config, ProviderKind};

/// Either the quota-guarded HTTP client or the in-process stub table.
pub enum Provider {
    Http(QuotaGuard<HttpRateProvider>),
    Stub(StubRateProvider),
}

impl Provider {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        match config.provider {
            ProviderKind::Http => {
                let http = HttpRateProvider::new(HttpProviderConfig {
                    base_url: config.provider_url.clone(),
                    api_key: config.provider_api_key.clone(),
                    timeout: config.provider_timeout,
                    ..HttpProviderConfig::default()
                })?;
                let guarded =
                    QuotaGuard::new(http, config.provider_quota, config.provider_quota_period)?;
                Ok(Self::Http(guarded))
            }
            ProviderKind::Stub => Ok(Self::Stub(StubRateProvider::new())),
        }
    }
}

#[async_trait]
impl RateProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Self::Http(p) => p.name(),
            Self::Stub(p) => p.name(),
        }
    }

    async fn fetch(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        match self {
            Self::Http(p) => p.fetch(base).await,
            Self::Stub(p) => p.fetch(base).await,
        }
    }
}
