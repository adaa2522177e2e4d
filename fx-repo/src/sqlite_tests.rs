//! SQLite rate store integration tests.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use fx_types::{CurrencyCode, RateEntry, RateSource, RateStore};
    use rust_decimal_macros::dec;

    use crate::SqliteRateStore;

    async fn setup_repo() -> SqliteRateStore {
        SqliteRateStore::new("sqlite::memory:").await.unwrap()
    }

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap()
    }

    fn entry(from: &str, to: &str, rate: rust_decimal::Decimal, fetched_at: DateTime<Utc>) -> RateEntry {
        RateEntry::new(
            code(from),
            code(to),
            rate,
            RateSource::Api,
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            fetched_at,
            Duration::hours(24),
        )
        .unwrap()
        .with_provider("exchangerate-api")
    }

    async fn add_payment_method(repo: &SqliteRateStore, id: &str, currency: &str, active: bool) {
        sqlx::query(
            "INSERT INTO payment_methods (id, name, currency, is_active, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(format!("method {id}"))
        .bind(currency)
        .bind(active as i64)
        .bind("2026-10-01T09:00:00.000000Z")
        .execute(repo.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_rate() {
        let repo = setup_repo().await;

        let result = repo.get_rate(&code("USD"), &code("EUR")).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = setup_repo().await;
        let stored = entry("USD", "EUR", dec!(0.92), t0());

        repo.upsert_rate(&stored).await.unwrap();
        let fetched = repo
            .get_rate(&code("USD"), &code("EUR"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched, stored);
        assert_eq!(fetched.api_provider.as_deref(), Some("exchangerate-api"));
        assert_eq!(fetched.expires_at, t0() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_row() {
        let repo = setup_repo().await;

        let mut first = entry("USD", "EUR", dec!(0.92), t0());
        first.is_stale = true;
        first.fetch_error_count = 3;
        repo.upsert_rate(&first).await.unwrap();

        let second = entry("USD", "EUR", dec!(0.93), t0() + Duration::hours(25));
        repo.upsert_rate(&second).await.unwrap();

        let rates = repo.list_rates().await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].rate, dec!(0.93));
        assert!(!rates[0].is_stale);
        assert_eq!(rates[0].fetch_error_count, 0);
    }

    #[tokio::test]
    async fn test_upsert_pair_writes_both_rows() {
        let repo = setup_repo().await;
        let direct = entry("USD", "UAH", dec!(41.5), t0());
        let inverse = direct.inverse().unwrap();

        repo.upsert_rate_pair(&direct, &inverse).await.unwrap();

        let back = repo
            .get_rate(&code("UAH"), &code("USD"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.rate, dec!(0.024096));
        assert_eq!(back.source, RateSource::System);
        assert_eq!(repo.list_rates().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_pair_rolls_back_when_second_row_fails() {
        let repo = setup_repo().await;
        let direct = entry("USD", "EUR", dec!(0.92), t0());
        let mut inverse = direct.inverse().unwrap();
        // Violates CHECK (from_currency <> to_currency).
        inverse.to_currency = inverse.from_currency.clone();

        let result = repo.upsert_rate_pair(&direct, &inverse).await;

        assert!(result.is_err());
        assert!(repo
            .get_rate(&code("USD"), &code("EUR"))
            .await
            .unwrap()
            .is_none());
        assert!(repo.list_rates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_stale_only_flags_expired_once() {
        let repo = setup_repo().await;
        repo.upsert_rate(&entry("USD", "EUR", dec!(0.92), t0()))
            .await
            .unwrap();
        repo.upsert_rate(&entry("USD", "GBP", dec!(0.79), t0() + Duration::hours(12)))
            .await
            .unwrap();

        // Exactly at expiry counts as expired.
        let now = t0() + Duration::hours(24);
        assert_eq!(repo.mark_stale(now).await.unwrap(), 1);
        assert_eq!(repo.mark_stale(now).await.unwrap(), 0);

        let eur = repo
            .get_rate(&code("USD"), &code("EUR"))
            .await
            .unwrap()
            .unwrap();
        let gbp = repo
            .get_rate(&code("USD"), &code("GBP"))
            .await
            .unwrap()
            .unwrap();
        assert!(eur.is_stale);
        assert!(!gbp.is_stale);
    }

    #[tokio::test]
    async fn test_cleanup_removes_old_rows() {
        let repo = setup_repo().await;
        repo.upsert_rate(&entry("USD", "EUR", dec!(0.92), t0() - Duration::days(91)))
            .await
            .unwrap();
        repo.upsert_rate(&entry("USD", "GBP", dec!(0.79), t0()))
            .await
            .unwrap();

        let removed = repo.cleanup(t0() - Duration::days(90)).await.unwrap();

        assert_eq!(removed, 1);
        let rates = repo.list_rates().await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].to_currency, code("GBP"));
    }

    #[tokio::test]
    async fn test_record_fetch_failure_touches_both_directions() {
        let repo = setup_repo().await;
        let direct = entry("USD", "EUR", dec!(0.92), t0());
        repo.upsert_rate_pair(&direct, &direct.inverse().unwrap())
            .await
            .unwrap();

        let touched = repo
            .record_fetch_failure(&code("USD"), &code("EUR"))
            .await
            .unwrap();
        assert_eq!(touched, 2);
        repo.record_fetch_failure(&code("EUR"), &code("USD"))
            .await
            .unwrap();

        for rate in repo.list_rates().await.unwrap() {
            assert_eq!(rate.fetch_error_count, 2);
        }
    }

    #[tokio::test]
    async fn test_record_fetch_failure_without_rows() {
        let repo = setup_repo().await;

        let touched = repo
            .record_fetch_failure(&code("USD"), &code("JPY"))
            .await
            .unwrap();

        assert_eq!(touched, 0);
    }

    #[tokio::test]
    async fn test_list_active_currencies() {
        let repo = setup_repo().await;
        add_payment_method(&repo, "pm-1", "UAH", true).await;
        add_payment_method(&repo, "pm-2", "uah", true).await;
        add_payment_method(&repo, "pm-3", "EUR", true).await;
        add_payment_method(&repo, "pm-4", "GBP", false).await;

        let currencies = repo.list_active_currencies().await.unwrap();

        assert_eq!(currencies, vec![code("EUR"), code("UAH")]);
    }

    #[tokio::test]
    async fn test_list_rates_ordered_by_pair() {
        let repo = setup_repo().await;
        for (from, to) in [("USD", "UAH"), ("EUR", "USD"), ("USD", "EUR")] {
            repo.upsert_rate(&entry(from, to, dec!(1.5), t0()))
                .await
                .unwrap();
        }

        let pairs: Vec<String> = repo
            .list_rates()
            .await
            .unwrap()
            .into_iter()
            .map(|r| format!("{}/{}", r.from_currency, r.to_currency))
            .collect();

        assert_eq!(pairs, vec!["EUR/USD", "USD/EUR", "USD/UAH"]);
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let repo = setup_repo().await;
        repo.upsert_rate(&entry("USD", "EUR", dec!(0.92), t0()))
            .await
            .unwrap();

        repo.create_schema().await.unwrap();

        assert_eq!(repo.list_rates().await.unwrap().len(), 1);
    }
}
