//! HTTP handlers and routing.

pub mod health;
pub mod predict;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Builds the application router. CORS and request tracing are layered on
/// by the caller, which owns the configuration they depend on.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::check))
        .route("/health", get(health::check))
        .route("/predict", post(predict::predict))
        .with_state(state)
}
