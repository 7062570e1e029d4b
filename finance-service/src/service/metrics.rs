use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{models::metrics::MetricsResponse, AppState};

use super::common::AppError;
use super::ratio_service::RatioService;

pub(crate) async fn corp_metrics(
    Path(corp_code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = RatioService::new(&state.db.pool).fetch_all(&corp_code).await;

    match result {
        Ok(rows) => MetricsResponse { response: rows }.into_response(),
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn year_metrics(
    Path((corp_code, bsns_year)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = RatioService::new(&state.db.pool)
        .fetch(&corp_code, &bsns_year)
        .await
        .and_then(|record| {
            record.ok_or_else(|| AppError::NotFound(format!("metrics for {corp_code}/{bsns_year}")))
        });

    match result {
        Ok(record) => record.into_response(),
        Err(e) => e.into_response(),
    }
}
