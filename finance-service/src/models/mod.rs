use std::fmt;

use serde::{Deserialize, Serialize};

pub(super) mod company;
pub(super) mod financial;
pub(super) mod metrics;
pub(super) mod settings;
pub(super) mod statement;

/// Statement division (`sj_div`) of a filing line item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub(crate) enum StatementDivision {
    BalanceSheet,
    IncomeStatement,
    ComprehensiveIncome,
    CashFlow,
    EquityChanges,
    Other(String),
}

impl StatementDivision {
    pub fn as_str(&self) -> &str {
        match self {
            StatementDivision::BalanceSheet => "BS",
            StatementDivision::IncomeStatement => "IS",
            StatementDivision::ComprehensiveIncome => "CIS",
            StatementDivision::CashFlow => "CF",
            StatementDivision::EquityChanges => "SCE",
            StatementDivision::Other(code) => code,
        }
    }

    /// Divisions the ratio calculator reads from
    pub fn is_ratio_source(&self) -> bool {
        matches!(
            self,
            StatementDivision::BalanceSheet | StatementDivision::IncomeStatement
        )
    }
}

impl From<&str> for StatementDivision {
    fn from(code: &str) -> Self {
        match code.trim() {
            "BS" => StatementDivision::BalanceSheet,
            "IS" => StatementDivision::IncomeStatement,
            "CIS" => StatementDivision::ComprehensiveIncome,
            "CF" => StatementDivision::CashFlow,
            "SCE" => StatementDivision::EquityChanges,
            other => StatementDivision::Other(other.to_string()),
        }
    }
}

impl From<String> for StatementDivision {
    fn from(code: String) -> Self {
        StatementDivision::from(code.as_str())
    }
}

impl From<StatementDivision> for String {
    fn from(val: StatementDivision) -> Self {
        val.as_str().to_string()
    }
}

impl fmt::Display for StatementDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl sqlx::Type<sqlx::Postgres> for StatementDivision {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl sqlx::Encode<'_, sqlx::Postgres> for StatementDivision {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for StatementDivision {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let value = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(StatementDivision::from(value))
    }
}
