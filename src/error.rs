use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::logic::model::ModelError;

pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by the HTTP layer.
///
/// Detail strings are logged server-side; response bodies stay generic so
/// internals never leak to callers.
#[derive(Debug)]
pub enum AppError {
    /// No model is loaded. Scoring is down but the process stays up.
    ModelUnavailable,
    /// Scoring failed after validation, e.g. a layout drift mid-request.
    Scoring(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model is not loaded. Please check server logs.".to_string(),
            ),
            AppError::Scoring(detail) => {
                tracing::error!("Scoring failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, "Scoring failed".to_string())
            }
        };
        (status, Json(json!({ "error": message, "status": status.as_u16() }))).into_response()
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unavailable(_) => AppError::ModelUnavailable,
            ModelError::SchemaMismatch { .. } => AppError::Scoring(err.to_string()),
        }
    }
}
