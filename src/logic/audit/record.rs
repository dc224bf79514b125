//! Audit record construction.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::logic::explain::types::Driver;
use crate::logic::model::pipeline::ScoreOutcome;
use crate::logic::schema::LoanApplication;

/// One scored request as persisted to the audit log.
///
/// The probability is stored at full precision; any rounding applied to the
/// HTTP response is presentation only and never reaches the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// ISO-8601 UTC timestamp taken when the record is captured.
    pub timestamp: String,
    pub decision: String,
    pub probability: Option<f64>,
    /// The raw input exactly as submitted.
    pub input: LoanApplication,
    pub drivers: Vec<Driver>,
}

impl AuditRecord {
    /// Captures a record for one scored request, `Error` outcomes included.
    pub fn capture(application: &LoanApplication, outcome: &ScoreOutcome) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            decision: outcome.decision.as_str().to_string(),
            probability: outcome.probability,
            input: application.clone(),
            drivers: outcome.drivers.clone(),
        }
    }
}
