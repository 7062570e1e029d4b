use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct FinancialRequest {
    pub company_name: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct FinancialQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinancialMetrics {
    pub operating_margin: Vec<Option<f64>>,
    pub net_margin: Vec<Option<f64>>,
    pub roe: Vec<Option<f64>>,
    pub roa: Vec<Option<f64>>,
    pub years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GrowthData {
    pub revenue_growth: Vec<Option<f64>>,
    pub net_income_growth: Vec<Option<f64>>,
    pub years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DebtLiquidityData {
    pub debt_ratio: Vec<Option<f64>>,
    pub current_ratio: Vec<Option<f64>>,
    pub years: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinancialMetricsResponse {
    pub company_name: String,
    pub financial_metrics: FinancialMetrics,
    pub growth_data: GrowthData,
    pub debt_liquidity_data: DebtLiquidityData,
}

impl IntoResponse for FinancialMetricsResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
