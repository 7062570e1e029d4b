use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;

pub(crate) const METRIC_COLUMNS: [&str; 13] = [
    "corp_code",
    "bsns_year",
    "debt_ratio",
    "current_ratio",
    "operating_profit_ratio",
    "net_profit_ratio",
    "roe",
    "roa",
    "debt_dependency",
    "sales_growth",
    "operating_profit_growth",
    "eps_growth",
    "updated_at",
];

pub(crate) const METRIC_KEYS: [&str; 2] = ["corp_code", "bsns_year"];

/// Named ratios of one fiscal period, in percent. `None` means the ratio
/// could not be computed because its denominator was zero, which is not
/// the same thing as a ratio of 0%.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub(crate) struct RatioSet {
    pub debt_ratio: Option<f64>,
    pub current_ratio: Option<f64>,
    pub operating_profit_ratio: Option<f64>,
    pub net_profit_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
    pub debt_dependency: Option<f64>,
    pub sales_growth: Option<f64>,
    pub operating_profit_growth: Option<f64>,
    pub eps_growth: Option<f64>,
}

//"metrics": one cached row per (corp_code, bsns_year)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub(crate) struct MetricsRecord {
    pub corp_code: String,
    pub bsns_year: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub ratios: RatioSet,
    pub updated_at: DateTime<Utc>,
}

impl IntoResponse for MetricsRecord {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "metrics": self
        }));

        (StatusCode::OK, body).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub(crate) struct MetricsResponse {
    pub response: Vec<MetricsRecord>,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "metrics": self.response
        }));

        (StatusCode::OK, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_ratio_serializes_as_null() {
        let ratios = RatioSet {
            debt_ratio: Some(50.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&ratios).unwrap();
        assert_eq!(json["debt_ratio"], 50.0);
        assert!(json["current_ratio"].is_null());
    }

    #[test]
    fn test_record_flattens_ratios() {
        let record = MetricsRecord {
            corp_code: "00126380".to_string(),
            bsns_year: "2023".to_string(),
            ratios: RatioSet {
                roe: Some(4.5),
                ..Default::default()
            },
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["corp_code"], "00126380");
        assert_eq!(json["roe"], 4.5);
        assert!(json.get("ratios").is_none());
    }
}
