use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::logic::audit::AuditRecord;
use crate::logic::explain::Driver;
use crate::logic::model::Decision;
use crate::logic::schema::LoanApplication;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub decision: Decision,
    /// Approval probability rounded to three decimals, `null` for `Error`
    /// outcomes. The audit trail keeps the unrounded value.
    pub probability: Option<f64>,
    pub drivers: Vec<Driver>,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Scores one application and appends the outcome to the audit log.
///
/// The audit write is best-effort relative to the response: a failed append
/// is logged loudly but never turns a scored decision into an error.
pub async fn predict(
    State(state): State<AppState>,
    Json(application): Json<LoanApplication>,
) -> AppResult<Json<PredictResponse>> {
    let service = state.service.as_ref().ok_or(AppError::ModelUnavailable)?;
    let outcome = service.score(&application)?;
    tracing::info!(
        "Scored application: {} (probability {:.3})",
        outcome.decision.as_str(),
        outcome.probability.unwrap_or(f64::NAN)
    );

    let record = AuditRecord::capture(&application, &outcome);
    if let Err(err) = state.audit.append(&record) {
        tracing::error!("Failed to append audit record: {}", err);
    }

    Ok(Json(PredictResponse {
        decision: outcome.decision,
        probability: outcome.probability.map(round3),
        drivers: outcome.drivers,
    }))
}
