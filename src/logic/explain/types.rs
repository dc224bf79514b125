//! Shared types for decision explanations.

use serde::{Deserialize, Serialize};

/// Direction a driver pushes the decision.
///
/// Contributions are computed toward the approval probability, but the
/// label is phrased from the rejection side: a positive score reads as
/// supporting rejection. Downstream consumers render these strings as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverEffect {
    #[serde(rename = "Support Approval")]
    SupportApproval,
    #[serde(rename = "Support Rejection")]
    SupportRejection,
}

impl DriverEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverEffect::SupportApproval => "Support Approval",
            DriverEffect::SupportRejection => "Support Rejection",
        }
    }
}

/// One ranked risk driver in a decision explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Human-readable feature label.
    pub label: String,
    /// Attribution score for the transformed feature, full precision.
    pub score: f64,
    pub effect: DriverEffect,
}
