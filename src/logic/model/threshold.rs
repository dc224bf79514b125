//! Decision policy applied to the classifier score.

use serde::{Deserialize, Serialize};

/// Probability at or above which an application is approved.
pub const APPROVAL_THRESHOLD: f64 = 0.50;

/// Final outcome for one scored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
    /// The classifier produced no usable probability.
    Error,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "Approved",
            Decision::Rejected => "Rejected",
            Decision::Error => "Error",
        }
    }
}

/// Maps an approval probability to a [`Decision`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub threshold: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self { threshold: APPROVAL_THRESHOLD }
    }
}

impl DecisionPolicy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The boundary is inclusive: a probability exactly at the threshold
    /// approves. NaN short-circuits to `Error`.
    pub fn decide(&self, probability: f64) -> Decision {
        if probability.is_nan() {
            Decision::Error
        } else if probability >= self.threshold {
            Decision::Approved
        } else {
            Decision::Rejected
        }
    }
}
