//! SQLite rate store adapter.
#![allow(clippy::collapsible_if)]

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};

use fx_types::{CurrencyCode, RateEntry, RateStore, RepoError};

use crate::types::{DbCurrency, DbRateEntry, distinct_currencies, format_timestamp};

const RATE_COLUMNS: &str = "from_currency, to_currency, rate, as_of_date, source, api_provider, \
                            fetched_at, expires_at, is_stale, fetch_error_count";

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Rate Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite rate store implementation.
pub struct SqliteRateStore {
    pool: SqlitePool,
}

impl SqliteRateStore {
    /// Creates a new SQLite store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives as long as its connection.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        let store = Self { pool };
        store.create_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_exchange_rates.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let ddl_methods = include_str!("../migrations/0002_create_payment_methods.sql");
        sqlx::query(ddl_methods)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(())
    }
}

/// Writes one entry on a pooled connection or inside an open transaction.
async fn upsert_on(conn: &mut SqliteConnection, entry: &RateEntry) -> Result<(), RepoError> {
    let sql = format!(
        r#"INSERT INTO exchange_rates ({RATE_COLUMNS})
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
           ON CONFLICT (from_currency, to_currency) DO UPDATE SET
               rate = excluded.rate,
               as_of_date = excluded.as_of_date,
               source = excluded.source,
               api_provider = excluded.api_provider,
               fetched_at = excluded.fetched_at,
               expires_at = excluded.expires_at,
               is_stale = excluded.is_stale,
               fetch_error_count = excluded.fetch_error_count"#
    );

    sqlx::query(&sql)
        .bind(entry.from_currency.as_str())
        .bind(entry.to_currency.as_str())
        .bind(entry.rate.to_string())
        .bind(entry.as_of_date.to_string())
        .bind(entry.source.as_str())
        .bind(entry.api_provider.as_deref())
        .bind(format_timestamp(entry.fetched_at))
        .bind(format_timestamp(entry.expires_at))
        .bind(entry.is_stale as i64)
        .bind(entry.fetch_error_count)
        .execute(&mut *conn)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// RateStore implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<RateEntry>, RepoError> {
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM exchange_rates WHERE from_currency = ? AND to_currency = ?"
        );
        let row: Option<DbRateEntry> = sqlx::query_as(&sql)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRateEntry::into_domain).transpose()
    }

    async fn upsert_rate(&self, entry: &RateEntry) -> Result<(), RepoError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        upsert_on(&mut conn, entry).await
    }

    async fn upsert_rate_pair(
        &self,
        direct: &RateEntry,
        inverse: &RateEntry,
    ) -> Result<(), RepoError> {
        let mut db_tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))?;

        upsert_on(&mut db_tx, direct).await?;
        upsert_on(&mut db_tx, inverse).await?;

        db_tx
            .commit()
            .await
            .map_err(|e| RepoError::Transaction(e.to_string()))
    }

    async fn mark_stale(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"UPDATE exchange_rates SET is_stale = 1 WHERE is_stale = 0 AND expires_at <= ?"#,
        )
        .bind(format_timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM exchange_rates WHERE fetched_at < ?"#)
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn record_fetch_failure(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<u64, RepoError> {
        let result = sqlx::query(
            r#"UPDATE exchange_rates SET fetch_error_count = fetch_error_count + 1
               WHERE (from_currency = ? AND to_currency = ?)
                  OR (from_currency = ? AND to_currency = ?)"#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(to.as_str())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_active_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError> {
        let rows: Vec<DbCurrency> = sqlx::query_as(
            r#"SELECT DISTINCT currency FROM payment_methods WHERE is_active = 1"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(distinct_currencies(rows))
    }

    async fn list_rates(&self) -> Result<Vec<RateEntry>, RepoError> {
        let sql =
            format!("SELECT {RATE_COLUMNS} FROM exchange_rates ORDER BY from_currency, to_currency");
        let rows: Vec<DbRateEntry> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRateEntry::into_domain).collect()
    }
}
