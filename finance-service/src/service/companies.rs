use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    models::company::{Company, CompanyResponse},
    AppState,
};

use super::statement_service::StatementService;

pub(crate) async fn companies(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let result = StatementService::new(&state.db.pool, None).companies().await;

    match result {
        Ok(rows) => CompanyResponse { response: rows }.into_response(),
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn company(
    Path(corp_code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = StatementService::new(&state.db.pool, None)
        .company(&corp_code)
        .await;

    match result {
        Ok(company) => company.into_response(),
        Err(e) => e.into_response(),
    }
}

pub(crate) async fn save_company(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Company>,
) -> impl IntoResponse {
    let service = StatementService::new(&state.db.pool, None);
    let result = match service.save_company(&request).await {
        Ok(()) => service.company(request.corp_code.trim()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(company) => company.into_response(),
        Err(e) => e.into_response(),
    }
}
