use chrono::Utc;
use common::db_client::SqlQueryBuilder;
use sqlx::{PgConnection, PgPool};
use tracing::{error, info};

use crate::models::{
    metrics::{MetricsRecord, RatioSet, METRIC_COLUMNS, METRIC_KEYS},
    statement::RawFinancialStatement,
};

use super::common::AppError;
use super::ratios::{calculate_ratios, AccountBook, Period};

const RATIO_SOURCE_QUERY: &str = r#"
    SELECT
        *
    FROM
        financials
    WHERE
        corp_code = $1
    AND bsns_year = $2
    AND sj_div IN ('BS', 'IS')
    ORDER BY
        sj_div, ord
    "#;

/// Computes ratio sets and keeps the `metrics` cache table
pub(crate) struct RatioService<'a> {
    pool: &'a PgPool,
}

impl<'a> RatioService<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        RatioService { pool }
    }

    /// Reads the filing lines of (corp_code, bsns_year), computes the
    /// current-period ratios and upserts them, all in one transaction.
    /// Nothing is committed when any step fails.
    pub async fn calculate_and_save(
        &self,
        corp_code: &str,
        bsns_year: &str,
    ) -> Result<RatioSet, AppError> {
        let mut tx = self.pool.begin().await?;

        match Self::calculate_and_upsert(&mut *tx, corp_code, bsns_year).await {
            Ok(ratios) => {
                tx.commit().await?;
                info!("Saved ratios for {corp_code}/{bsns_year}");
                Ok(ratios)
            }
            Err(e) => {
                error!("Ratio calculation for {corp_code}/{bsns_year} failed: {e}");
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Rollback for {corp_code}/{bsns_year} failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    async fn calculate_and_upsert(
        conn: &mut PgConnection,
        corp_code: &str,
        bsns_year: &str,
    ) -> Result<RatioSet, AppError> {
        let rows = sqlx::query_as::<_, RawFinancialStatement>(RATIO_SOURCE_QUERY)
            .bind(corp_code)
            .bind(bsns_year)
            .fetch_all(&mut *conn)
            .await?;

        let book = AccountBook::from_statements(&rows)?;
        let ratios = calculate_ratios(&book, Period::Current);

        let sql = SqlQueryBuilder::prepare_upsert_statement("metrics", &METRIC_COLUMNS, &METRIC_KEYS);
        sqlx::query(&sql)
            .bind(corp_code)
            .bind(bsns_year)
            .bind(ratios.debt_ratio)
            .bind(ratios.current_ratio)
            .bind(ratios.operating_profit_ratio)
            .bind(ratios.net_profit_ratio)
            .bind(ratios.roe)
            .bind(ratios.roa)
            .bind(ratios.debt_dependency)
            .bind(ratios.sales_growth)
            .bind(ratios.operating_profit_growth)
            .bind(ratios.eps_growth)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        Ok(ratios)
    }

    pub async fn fetch(
        &self,
        corp_code: &str,
        bsns_year: &str,
    ) -> Result<Option<MetricsRecord>, AppError> {
        let sql = SqlQueryBuilder::prepare_fetch_statement("metrics", &METRIC_KEYS);
        let record = sqlx::query_as::<_, MetricsRecord>(&sql)
            .bind(corp_code)
            .bind(bsns_year)
            .fetch_optional(self.pool)
            .await?;
        Ok(record)
    }

    /// Every cached year of a corporation, newest first
    pub async fn fetch_all(&self, corp_code: &str) -> Result<Vec<MetricsRecord>, AppError> {
        let sql = format!(
            "{} ORDER BY bsns_year DESC",
            SqlQueryBuilder::prepare_fetch_statement("metrics", &["corp_code"])
        );
        let records = sqlx::query_as::<_, MetricsRecord>(&sql)
            .bind(corp_code)
            .fetch_all(self.pool)
            .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::statement_service::StatementService;
    use crate::service::tests::statement_row;

    async fn metrics_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM metrics")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_calculate_and_save_upserts(pool: PgPool) {
        let rows = vec![
            statement_row("00126380", "BS", "부채총계", "50", "40"),
            statement_row("00126380", "BS", "자본총계", "100", "0"),
            statement_row("00126380", "IS", "매출액", "120", "100"),
        ];
        StatementService::new(&pool, None)
            .save_statements(&rows)
            .await
            .unwrap();

        let service = RatioService::new(&pool);
        let ratios = service.calculate_and_save("00126380", "2023").await.unwrap();
        assert_eq!(ratios.debt_ratio, Some(50.0));
        assert_eq!(ratios.sales_growth, Some(20.0));

        // Second run replaces the row for the same key
        service.calculate_and_save("00126380", "2023").await.unwrap();
        assert_eq!(metrics_count(&pool).await, 1);

        let record = service.fetch("00126380", "2023").await.unwrap().unwrap();
        assert_eq!(record.ratios.debt_ratio, Some(50.0));
        assert_eq!(record.ratios.current_ratio, None);
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_failed_upsert_leaves_metrics_unchanged(pool: PgPool) {
        sqlx::query("INSERT INTO metrics (corp_code, bsns_year, roe) VALUES ('00126380', '2023', 12.5)")
            .execute(&pool)
            .await
            .unwrap();
        // Existing rows are grandfathered; the recomputed roe of 20 is rejected
        sqlx::query("ALTER TABLE metrics ADD CONSTRAINT roe_cap CHECK (roe < 15) NOT VALID")
            .execute(&pool)
            .await
            .unwrap();

        let rows = vec![
            statement_row("00126380", "BS", "자본총계", "300", "200"),
            statement_row("00126380", "IS", "당기순이익", "60", "50"),
        ];
        StatementService::new(&pool, None)
            .save_statements(&rows)
            .await
            .unwrap();

        let service = RatioService::new(&pool);
        let result = service.calculate_and_save("00126380", "2023").await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        assert_eq!(metrics_count(&pool).await, 1);
        let record = service.fetch("00126380", "2023").await.unwrap().unwrap();
        assert_eq!(record.ratios.roe, Some(12.5));
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_malformed_amount_saves_nothing(pool: PgPool) {
        let rows = vec![statement_row("00126380", "BS", "자산총계", "12x", "10")];
        StatementService::new(&pool, None)
            .save_statements(&rows)
            .await
            .unwrap();

        let result = RatioService::new(&pool)
            .calculate_and_save("00126380", "2023")
            .await;
        assert!(matches!(result, Err(AppError::CalculationError(_))));
        assert_eq!(metrics_count(&pool).await, 0);
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn test_fetch_all_newest_first(pool: PgPool) {
        let service = RatioService::new(&pool);
        for year in ["2021", "2023", "2022"] {
            service.calculate_and_save("00126380", year).await.unwrap();
        }
        let years: Vec<String> = service
            .fetch_all("00126380")
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.bsns_year)
            .collect();
        assert_eq!(years, vec!["2023", "2022", "2021"]);
    }
}
