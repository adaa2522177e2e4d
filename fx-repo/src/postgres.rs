//! PostgreSQL rate store adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use fx_types::{CurrencyCode, RateEntry, RateStore, RepoError};

use crate::types::{DbCurrency, PgRateEntry, distinct_currencies};

const RATE_COLUMNS: &str = "from_currency, to_currency, rate, as_of_date, source, api_provider, \
                            fetched_at, expires_at, is_stale, fetch_error_count";

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Rate Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL rate store.
pub struct PostgresRateStore {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_exchange_rates_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payment_methods_pg.sql"),
        "0002",
    )
    .await?;

    Ok(())
}

impl PostgresRateStore {
    /// Creates a new PostgreSQL store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

async fn upsert_on(conn: &mut PgConnection, entry: &RateEntry) -> Result<(), RepoError> {
    let sql = format!(
        r#"INSERT INTO exchange_rates ({RATE_COLUMNS})
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
           ON CONFLICT (from_currency, to_currency) DO UPDATE SET
               rate = EXCLUDED.rate,
               as_of_date = EXCLUDED.as_of_date,
               source = EXCLUDED.source,
               api_provider = EXCLUDED.api_provider,
               fetched_at = EXCLUDED.fetched_at,
               expires_at = EXCLUDED.expires_at,
               is_stale = EXCLUDED.is_stale,
               fetch_error_count = EXCLUDED.fetch_error_count"#
    );

    sqlx::query(&sql)
        .bind(entry.from_currency.as_str())
        .bind(entry.to_currency.as_str())
        .bind(entry.rate)
        .bind(entry.as_of_date)
        .bind(entry.source.as_str())
        .bind(entry.api_provider.as_deref())
        .bind(entry.fetched_at)
        .bind(entry.expires_at)
        .bind(entry.is_stale)
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
impl RateStore for PostgresRateStore {
    async fn get_rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Option<RateEntry>, RepoError> {
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM exchange_rates WHERE from_currency = $1 AND to_currency = $2"
        );
        let row: Option<PgRateEntry> = sqlx::query_as(&sql)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(PgRateEntry::into_domain).transpose()
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
            r#"UPDATE exchange_rates SET is_stale = TRUE WHERE is_stale = FALSE AND expires_at <= $1"#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn cleanup(&self, cutoff: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = sqlx::query(r#"DELETE FROM exchange_rates WHERE fetched_at < $1"#)
            .bind(cutoff)
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
               WHERE (from_currency = $1 AND to_currency = $2)
                  OR (from_currency = $2 AND to_currency = $1)"#,
        )
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_active_currencies(&self) -> Result<Vec<CurrencyCode>, RepoError> {
        let rows: Vec<DbCurrency> = sqlx::query_as(
            r#"SELECT DISTINCT currency FROM payment_methods WHERE is_active = TRUE"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(distinct_currencies(rows))
    }

    async fn list_rates(&self) -> Result<Vec<RateEntry>, RepoError> {
        let sql =
            format!("SELECT {RATE_COLUMNS} FROM exchange_rates ORDER BY from_currency, to_currency");
        let rows: Vec<PgRateEntry> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(PgRateEntry::into_domain).collect()
    }
}
