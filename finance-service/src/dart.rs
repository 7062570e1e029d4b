//! Client for the DART Open API (Korea FSS electronic disclosure system).
//!
//! Only the single-company major-accounts endpoint is used: it returns the
//! balance-sheet and income-statement headline lines of one periodic report
//! with three fiscal periods per line.

use serde::{de, Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{statement::RawFinancialStatement, StatementDivision};

const SINGLE_COMPANY_ACCOUNTS: &str = "/api/fnlttSinglAcnt.json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const STATUS_OK: &str = "000";
const STATUS_NO_DATA: &str = "013";

/// Consolidated statements
const CONSOLIDATED: &str = "CFS";

#[derive(Debug, Error)]
pub(crate) enum DartError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("status {status}: {message}")]
    Api { status: String, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct DartResponse<T> {
    status: String,
    message: String,
    #[serde(default = "Vec::new")]
    list: Vec<T>,
}

fn de_ord<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OrdValue {
        Number(i32),
        Text(String),
    }

    match OrdValue::deserialize(deserializer)? {
        OrdValue::Number(n) => Ok(n),
        OrdValue::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

fn default_currency() -> String {
    "KRW".to_string()
}

/// One line of the major-accounts response
#[derive(Debug, Clone, Deserialize)]
struct DartStatementRow {
    rcept_no: String,
    reprt_code: String,
    bsns_year: String,
    corp_code: String,
    #[serde(default)]
    fs_div: String,
    sj_div: StatementDivision,
    sj_nm: String,
    account_nm: String,
    #[serde(default)]
    thstrm_nm: String,
    #[serde(default)]
    thstrm_amount: String,
    #[serde(default)]
    frmtrm_nm: String,
    #[serde(default)]
    frmtrm_amount: String,
    #[serde(default)]
    bfefrmtrm_nm: String,
    #[serde(default)]
    bfefrmtrm_amount: Option<String>,
    #[serde(deserialize_with = "de_ord")]
    ord: i32,
    #[serde(default = "default_currency")]
    currency: String,
}

impl From<DartStatementRow> for RawFinancialStatement {
    fn from(row: DartStatementRow) -> Self {
        RawFinancialStatement {
            corp_code: row.corp_code,
            bsns_year: row.bsns_year,
            sj_div: row.sj_div,
            account_nm: row.account_nm,
            rcept_no: row.rcept_no,
            reprt_code: row.reprt_code,
            sj_nm: row.sj_nm,
            thstrm_nm: row.thstrm_nm,
            thstrm_amount: row.thstrm_amount,
            frmtrm_nm: row.frmtrm_nm,
            frmtrm_amount: row.frmtrm_amount,
            bfefrmtrm_nm: row.bfefrmtrm_nm,
            bfefrmtrm_amount: row.bfefrmtrm_amount,
            ord: row.ord,
            currency: row.currency,
        }
    }
}

/// The response mixes consolidated and separate statements with the same
/// account labels. Keep the consolidated set when there is one.
fn select_statements(rows: Vec<DartStatementRow>) -> Vec<RawFinancialStatement> {
    let has_consolidated = rows.iter().any(|row| row.fs_div == CONSOLIDATED);
    rows.into_iter()
        .filter(|row| !has_consolidated || row.fs_div == CONSOLIDATED)
        .map(RawFinancialStatement::from)
        .collect()
}

pub(crate) struct DartClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DartClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, DartError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(DartClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Major account lines of one periodic report. An empty vector means
    /// the filing does not exist (yet).
    pub async fn single_company_accounts(
        &self,
        corp_code: &str,
        bsns_year: &str,
        reprt_code: &str,
    ) -> Result<Vec<RawFinancialStatement>, DartError> {
        let url = format!("{}{}", self.base_url, SINGLE_COMPANY_ACCOUNTS);
        debug!("GET {url} corp_code={corp_code} bsns_year={bsns_year} reprt_code={reprt_code}");

        let body = self
            .client
            .get(url)
            .query(&[
                ("crtfc_key", self.api_key.as_str()),
                ("corp_code", corp_code),
                ("bsns_year", bsns_year),
                ("reprt_code", reprt_code),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let response: DartResponse<DartStatementRow> = serde_json::from_str(&body)?;

        match response.status.as_str() {
            STATUS_OK => {
                let rows = select_statements(response.list);
                info!(
                    "Fetched {} statement lines for {corp_code}/{bsns_year}",
                    rows.len()
                );
                Ok(rows)
            }
            STATUS_NO_DATA => {
                info!("No filing for {corp_code}/{bsns_year}: {}", response.message);
                Ok(Vec::new())
            }
            _ => Err(DartError::Api {
                status: response.status,
                message: response.message,
            }),
        }
    }
}

impl std::fmt::Debug for DartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DartClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
