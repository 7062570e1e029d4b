use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::StatementDivision;

/// Annual business report
pub(crate) const ANNUAL_REPORT: &str = "11011";

pub(crate) const STATEMENT_COLUMNS: [&str; 15] = [
    "corp_code",
    "bsns_year",
    "sj_div",
    "account_nm",
    "rcept_no",
    "reprt_code",
    "sj_nm",
    "thstrm_nm",
    "thstrm_amount",
    "frmtrm_nm",
    "frmtrm_amount",
    "bfefrmtrm_nm",
    "bfefrmtrm_amount",
    "ord",
    "currency",
];

pub(crate) const STATEMENT_KEYS: [&str; 4] = ["corp_code", "bsns_year", "sj_div", "account_nm"];

//"financials": amounts are kept exactly as filed, e.g. "1,234,567" or "-"
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub(crate) struct RawFinancialStatement {
    pub corp_code: String,
    pub bsns_year: String,
    pub sj_div: StatementDivision,
    pub account_nm: String,
    pub rcept_no: String,
    pub reprt_code: String,
    pub sj_nm: String,
    pub thstrm_nm: String,
    pub thstrm_amount: String,
    pub frmtrm_nm: String,
    pub frmtrm_amount: String,
    pub bfefrmtrm_nm: String,
    pub bfefrmtrm_amount: Option<String>,
    pub ord: i32,
    pub currency: String,
}
