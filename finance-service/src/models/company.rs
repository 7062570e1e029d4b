use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

pub(crate) const COMPANY_COLUMNS: [&str; 4] = ["corp_code", "corp_name", "stock_code", "modify_date"];

pub(crate) const COMPANY_KEYS: [&str; 1] = ["corp_code"];

//"companies": DART corporation directory, name -> 8-digit corp_code
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub(crate) struct Company {
    pub corp_code: String,
    pub corp_name: String,
    /// Empty for unlisted corporations
    #[serde(default)]
    pub stock_code: String,
    #[serde(default)]
    pub modify_date: String,
}

impl IntoResponse for Company {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "company": self
        }));

        (StatusCode::OK, body).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct CompanyResponse {
    pub response: Vec<Company>,
}

impl IntoResponse for CompanyResponse {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "companies": self.response
        }));

        (StatusCode::OK, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_request_defaults() {
        let company: Company =
            serde_json::from_str(r#"{"corp_code": "00126380", "corp_name": "삼성전자"}"#).unwrap();
        assert_eq!(company.stock_code, "");
        assert_eq!(company.modify_date, "");
    }
}
