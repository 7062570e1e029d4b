use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::fmt;

use crate::dart::DartError;

use super::ratios::CalculationError;

#[derive(Debug)]
pub(crate) enum AppError {
    DatabaseError(sqlx::Error),
    CalculationError(CalculationError),
    NotFound(String),
    InvalidInput(String),
    UpstreamError(DartError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e)
    }
}

impl From<CalculationError> for AppError {
    fn from(e: CalculationError) -> Self {
        AppError::CalculationError(e)
    }
}

impl From<DartError> for AppError {
    fn from(e: DartError) -> Self {
        AppError::UpstreamError(e)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {e}"),
            AppError::CalculationError(e) => write!(f, "Calculation error: {e}"),
            AppError::NotFound(what) => write!(f, "Not found: {what}"),
            AppError::InvalidInput(why) => write!(f, "Invalid input: {why}"),
            AppError::UpstreamError(e) => write!(f, "Filing API error: {e}"),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::CalculationError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
