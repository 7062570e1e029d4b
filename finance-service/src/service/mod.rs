use axum::http::StatusCode;

pub(crate) mod common;
mod companies;
mod financial;
mod metrics;
pub(crate) mod ratio_service;
pub(crate) mod ratios;
pub(crate) mod statement_service;

pub(crate) use companies::{companies, company, save_company};
pub(crate) use financial::financial;
pub(crate) use metrics::{corp_metrics, year_metrics};

pub(crate) async fn health() -> StatusCode {
    StatusCode::OK
}
