use common::db_client::SqlQueryBuilder;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::dart::DartClient;
use crate::models::{
    company::{Company, COMPANY_COLUMNS, COMPANY_KEYS},
    statement::{RawFinancialStatement, ANNUAL_REPORT, STATEMENT_COLUMNS, STATEMENT_KEYS},
};

use super::common::AppError;

const STATEMENT_QUERY: &str = r#"
    SELECT
        *
    FROM
        financials
    WHERE
        corp_code = $1
    AND bsns_year = $2
    ORDER BY
        sj_div, ord
    "#;

/// Companies and raw filing lines. Filing lines missing from the store are
/// fetched from DART when a client is configured.
pub(crate) struct StatementService<'a> {
    pool: &'a PgPool,
    dart: Option<&'a DartClient>,
}

impl<'a> StatementService<'a> {
    pub fn new(pool: &'a PgPool, dart: Option<&'a DartClient>) -> Self {
        StatementService { pool, dart }
    }

    pub async fn find_company(&self, corp_name: &str) -> Result<Company, AppError> {
        let sql = SqlQueryBuilder::prepare_fetch_statement("companies", &["corp_name"]);
        sqlx::query_as::<_, Company>(&sql)
            .bind(corp_name.trim())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company {corp_name}")))
    }

    pub async fn company(&self, corp_code: &str) -> Result<Company, AppError> {
        let sql = SqlQueryBuilder::prepare_fetch_statement("companies", &COMPANY_KEYS);
        sqlx::query_as::<_, Company>(&sql)
            .bind(corp_code)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("company {corp_code}")))
    }

    pub async fn companies(&self) -> Result<Vec<Company>, AppError> {
        let rows = sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY corp_name")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Adds a directory entry or replaces the one with the same corp_code
    pub async fn save_company(&self, company: &Company) -> Result<(), AppError> {
        let corp_code = company.corp_code.trim();
        if corp_code.len() != 8 || !corp_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::InvalidInput(format!(
                "corp_code must be 8 digits, got {:?}",
                company.corp_code
            )));
        }
        if company.corp_name.trim().is_empty() {
            return Err(AppError::InvalidInput("corp_name is empty".to_string()));
        }

        let sql = SqlQueryBuilder::prepare_upsert_statement("companies", &COMPANY_COLUMNS, &COMPANY_KEYS);
        sqlx::query(&sql)
            .bind(corp_code)
            .bind(company.corp_name.trim())
            .bind(company.stock_code.trim())
            .bind(company.modify_date.trim())
            .execute(self.pool)
            .await?;

        info!("Saved company {} ({corp_code})", company.corp_name.trim());
        Ok(())
    }

    pub async fn load_statements(
        &self,
        corp_code: &str,
        bsns_year: &str,
    ) -> Result<Vec<RawFinancialStatement>, AppError> {
        let rows = sqlx::query_as::<_, RawFinancialStatement>(STATEMENT_QUERY)
            .bind(corp_code)
            .bind(bsns_year)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Stored filing lines of (corp_code, bsns_year), fetching and storing
    /// the annual report first when there are none.
    pub async fn ensure_statements(
        &self,
        corp_code: &str,
        bsns_year: &str,
    ) -> Result<Vec<RawFinancialStatement>, AppError> {
        let stored = self.load_statements(corp_code, bsns_year).await?;
        if !stored.is_empty() {
            return Ok(stored);
        }

        let Some(dart) = self.dart else {
            warn!("No statements stored for {corp_code}/{bsns_year} and no filing API key configured");
            return Err(AppError::NotFound(format!(
                "financial statements for {corp_code}/{bsns_year}"
            )));
        };

        let fetched = dart
            .single_company_accounts(corp_code, bsns_year, ANNUAL_REPORT)
            .await?;
        if fetched.is_empty() {
            return Err(AppError::NotFound(format!(
                "annual report for {corp_code}/{bsns_year}"
            )));
        }

        self.save_statements(&fetched).await?;
        self.load_statements(corp_code, bsns_year).await
    }

    /// Inserts filing lines as filed, skipping lines already stored. All
    /// lines are written in one transaction.
    pub async fn save_statements(&self, rows: &[RawFinancialStatement]) -> Result<u64, AppError> {
        let sql = SqlQueryBuilder::prepare_insert_ignore_statement(
            "financials",
            &STATEMENT_COLUMNS,
            &STATEMENT_KEYS,
        );

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for row in rows {
            let result = sqlx::query(&sql)
                .bind(&row.corp_code)
                .bind(&row.bsns_year)
                .bind(&row.sj_div)
                .bind(&row.account_nm)
                .bind(&row.rcept_no)
                .bind(&row.reprt_code)
                .bind(&row.sj_nm)
                .bind(&row.thstrm_nm)
                .bind(&row.thstrm_amount)
                .bind(&row.frmtrm_nm)
                .bind(&row.frmtrm_amount)
                .bind(&row.bfefrmtrm_nm)
                .bind(&row.bfefrmtrm_amount)
                .bind(row.ord)
                .bind(&row.currency)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) => {
                    error!(
                        "Insert of {}/{} {} failed, rolling back: {e}",
                        row.corp_code, row.bsns_year, row.account_nm
                    );
                    if let Err(rollback_err) = tx.rollback().await {
                        error!("Rollback of statement insert failed: {rollback_err}");
                    }
                    return Err(AppError::DatabaseError(e));
                }
            }
        }

        tx.commit().await?;
        info!("Stored {inserted} of {} statement lines", rows.len());
        Ok(inserted)
    }
}
