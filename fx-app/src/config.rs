//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use anyhow::Context;
use chrono::Duration;

use exchange_rates::DEFAULT_BASE_URL;
use fx_hex::RateServiceConfig;
use fx_types::CurrencyCode;

/// Which outbound provider adapter to wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Http,
    Stub,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stub" => Ok(Self::Stub),
            other => anyhow::bail!("RATE_PROVIDER must be `http` or `stub`, got `{other}`"),
        }
    }
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub provider: ProviderKind,
    pub provider_url: String,
    pub provider_api_key: Option<String>,
    pub provider_timeout: StdDuration,
    pub provider_quota: u32,
    pub provider_quota_period: StdDuration,
    pub cache_ttl: Duration,
    pub retention: Duration,
    pub pivot: CurrencyCode,
    /// `None` disables the in-process scheduler
    pub refresh_interval: Option<StdDuration>,
    pub cron_secret: String,
    pub seed_stub_rates: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&var, "PORT", 3000)?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let provider = match var("RATE_PROVIDER") {
            Some(v) => v.parse()?,
            None => ProviderKind::Http,
        };
        let provider_url = var("RATE_PROVIDER_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let provider_api_key = var("RATE_PROVIDER_API_KEY");
        let timeout_secs: u64 = parse_or(&var, "RATE_PROVIDER_TIMEOUT_SECS", 5)?;
        if timeout_secs == 0 {
            anyhow::bail!("RATE_PROVIDER_TIMEOUT_SECS must be positive");
        }
        let provider_timeout = StdDuration::from_secs(timeout_secs);
        let provider_quota = parse_or(&var, "RATE_PROVIDER_QUOTA", 1500)?;
        let quota_hours: u64 = parse_or(&var, "RATE_PROVIDER_QUOTA_PERIOD_HOURS", 720)?;
        let provider_quota_period =
            seconds_of(quota_hours, 3600, "RATE_PROVIDER_QUOTA_PERIOD_HOURS")?;

        let ttl_hours = parse_or(&var, "RATE_CACHE_TTL_HOURS", 24)?;
        let cache_ttl = Duration::try_hours(ttl_hours)
            .ok_or_else(|| anyhow::anyhow!("RATE_CACHE_TTL_HOURS is out of range: {ttl_hours}"))?;
        let retention_days = parse_or(&var, "RATE_RETENTION_DAYS", 90)?;
        let retention = Duration::try_days(retention_days).ok_or_else(|| {
            anyhow::anyhow!("RATE_RETENTION_DAYS is out of range: {retention_days}")
        })?;

        let pivot = match var("RATE_PIVOT_CURRENCY") {
            Some(code) => CurrencyCode::new(&code).context("RATE_PIVOT_CURRENCY")?,
            None => CurrencyCode::usd(),
        };

        let interval_minutes: u64 = parse_or(&var, "RATE_REFRESH_INTERVAL_MINUTES", 0)?;
        let refresh_interval = match interval_minutes {
            0 => None,
            minutes => Some(seconds_of(minutes, 60, "RATE_REFRESH_INTERVAL_MINUTES")?),
        };

        let cron_secret = var("CRON_SECRET")
            .ok_or_else(|| anyhow::anyhow!("CRON_SECRET environment variable is required"))?;

        let seed_stub_rates = match var("SEED_STUB_RATES") {
            Some(v) => parse_flag(&v)?,
            None => false,
        };

        Ok(Self {
            port,
            database_url,
            provider,
            provider_url,
            provider_api_key,
            provider_timeout,
            provider_quota,
            provider_quota_period,
            cache_ttl,
            retention,
            pivot,
            refresh_interval,
            cron_secret,
            seed_stub_rates,
        })
    }

    /// Engine parameters derived from this configuration.
    pub fn service_config(&self) -> RateServiceConfig {
        RateServiceConfig {
            pivot: self.pivot.clone(),
            ttl: self.cache_ttl,
            retention: self.retention,
            fetch_timeout: self.provider_timeout,
            ..RateServiceConfig::default()
        }
    }
}

fn parse_or<T>(var: impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value `{v}`")),
        None => Ok(default),
    }
}

fn seconds_of(count: u64, unit_secs: u64, key: &str) -> anyhow::Result<StdDuration> {
    count
        .checked_mul(unit_secs)
        .map(StdDuration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("{key} is out of range: {count}"))
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("SEED_STUB_RATES must be a boolean, got `{other}`"),
    }
}
