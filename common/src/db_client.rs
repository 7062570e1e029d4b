use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{error, info};

use crate::parameter_store;

const DB_PASSWORD: &str = "DB_PASSWORD";

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub name: String,
    pub port: u16,
    pub host: String,
    pub user: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn url(&self, password: &str) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}?sslmode=disable",
            self.user, password, self.host, self.port, self.name
        )
    }
}

pub async fn startup_db(cfg: &DatabaseConfig) -> DBClient {
    match DBClient::new(cfg).await {
        Err(val) => {
            error!("Database startup failed: {val:#}");
            std::process::exit(1);
        }
        Ok(val) => val,
    }
}

#[derive(Debug)]
pub struct SqlQueryBuilder;

impl SqlQueryBuilder {
    pub fn prepare_insert_statement(table: &str, columns: &[&str]) -> String {
        let sql = format!("INSERT INTO {} ({})", table, columns.join(", "));
        let placeholders: String = (1..=columns.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<String>>()
            .join(", ");

        format!("{sql} VALUES ({placeholders})")
    }

    /// Insert that leaves an existing row with the same key untouched
    pub fn prepare_insert_ignore_statement(table: &str, columns: &[&str], keys: &[&str]) -> String {
        format!(
            "{} ON CONFLICT ({}) DO NOTHING",
            Self::prepare_insert_statement(table, columns),
            keys.join(", ")
        )
    }

    /// Insert that overwrites every non-key column of an existing row
    pub fn prepare_upsert_statement(table: &str, columns: &[&str], keys: &[&str]) -> String {
        let updates: Vec<String> = columns
            .iter()
            .filter(|column| !keys.contains(column))
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect();

        if updates.is_empty() {
            return Self::prepare_insert_ignore_statement(table, columns, keys);
        }

        format!(
            "{} ON CONFLICT ({}) DO UPDATE SET {}",
            Self::prepare_insert_statement(table, columns),
            keys.join(", "),
            updates.join(", ")
        )
    }

    pub fn prepare_fetch_statement(table: &str, filters: &[&str]) -> String {
        if filters.is_empty() {
            return format!("SELECT * FROM {table}");
        }

        let sql = format!("SELECT * FROM {table}");
        let placeholders: String = (1..=filters.len())
            .map(|i| format!("{} = ${}", filters[i - 1], i))
            .collect::<Vec<String>>()
            .join(" AND ");

        format!("{sql} WHERE {placeholders}")
    }
}

#[derive(Debug, Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl DBClient {
    pub async fn new(cfg: &DatabaseConfig) -> Result<Self> {
        let password = parameter_store::resolve(DB_PASSWORD, true)
            .await
            .context("Failed to resolve the database password")?;

        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(cfg.max_connections)
            .test_before_acquire(false)
            .connect(&cfg.url(&password))
            .await
            .with_context(|| {
                format!(
                    "Failed to start db connection pool for {}@{}:{}/{}",
                    cfg.user, cfg.host, cfg.port, cfg.name
                )
            })?;

        info!(
            "Connected to postgres {}:{}/{} (max {} connections)",
            cfg.host, cfg.port, cfg.name, cfg.max_connections
        );
        Ok(Self { pool })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_insert_statement() {
        let table = "financials";
        let columns = vec!["corp_code", "bsns_year", "account_nm"];
        let sql = SqlQueryBuilder::prepare_insert_statement(table, &columns);
        assert_eq!(
            sql,
            "INSERT INTO financials (corp_code, bsns_year, account_nm) VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn test_sql_insert_ignore_statement() {
        let sql = SqlQueryBuilder::prepare_insert_ignore_statement(
            "financials",
            &["corp_code", "bsns_year", "account_nm"],
            &["corp_code", "bsns_year"],
        );
        assert_eq!(
            sql,
            "INSERT INTO financials (corp_code, bsns_year, account_nm) VALUES ($1, $2, $3) ON CONFLICT (corp_code, bsns_year) DO NOTHING"
        );
    }

    #[test]
    fn test_sql_upsert_statement() {
        let sql = SqlQueryBuilder::prepare_upsert_statement(
            "metrics",
            &["corp_code", "bsns_year", "roe", "roa"],
            &["corp_code", "bsns_year"],
        );
        assert_eq!(
            sql,
            "INSERT INTO metrics (corp_code, bsns_year, roe, roa) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (corp_code, bsns_year) DO UPDATE SET roe = EXCLUDED.roe, roa = EXCLUDED.roa"
        );
    }

    #[test]
    fn test_sql_upsert_statement_keys_only() {
        let sql = SqlQueryBuilder::prepare_upsert_statement("companies", &["corp_code"], &["corp_code"]);
        assert_eq!(
            sql,
            "INSERT INTO companies (corp_code) VALUES ($1) ON CONFLICT (corp_code) DO NOTHING"
        );
    }

    #[test]
    fn test_sql_fetch_statement_whole_table() {
        let sql = SqlQueryBuilder::prepare_fetch_statement("metrics", &Vec::default());
        assert_eq!(sql, "SELECT * FROM metrics");
    }

    #[test]
    fn test_sql_fetch_statement_with_filter() {
        let sql = SqlQueryBuilder::prepare_fetch_statement("metrics", &["corp_code", "bsns_year"]);
        assert_eq!(
            sql,
            "SELECT * FROM metrics WHERE corp_code = $1 AND bsns_year = $2"
        );
    }

    #[test]
    fn test_database_url() {
        let cfg = DatabaseConfig {
            name: "finance".to_string(),
            port: 5432,
            host: "db".to_string(),
            user: "fin".to_string(),
            max_connections: 5,
        };
        assert_eq!(
            cfg.url("secret"),
            "postgresql://fin:secret@db:5432/finance?sslmode=disable"
        );
    }
}
