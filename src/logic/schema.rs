//! Canonical applicant schema.
//!
//! The raw field tables below define the one and only ordering used across
//! training, serving and attribution. The preprocessor emits transformed
//! columns derived from this ordering, and the layout hash ties a fitted
//! artifact to the column layout it was trained against.

use serde::{Deserialize, Serialize};

/// Bumped whenever the raw schema or the transformed layout rules change.
pub const SCHEMA_VERSION: u8 = 1;

/// Raw applicant fields in canonical order (the training CSV order with
/// identifier and target columns removed).
pub const RAW_FIELDS: [&str; 11] = [
    "no_of_dependents",
    "education",
    "self_employed",
    "income_annum",
    "loan_amount",
    "loan_term",
    "cibil_score",
    "residential_assets_value",
    "commercial_assets_value",
    "luxury_assets_value",
    "bank_asset_value",
];

/// Numeric fields, in the order they appear in a transformed row.
pub const NUMERIC_FIELDS: [&str; 9] = [
    "no_of_dependents",
    "income_annum",
    "loan_amount",
    "loan_term",
    "cibil_score",
    "residential_assets_value",
    "commercial_assets_value",
    "luxury_assets_value",
    "bank_asset_value",
];

/// Categorical fields, one-hot encoded after the numeric block.
pub const CATEGORICAL_FIELDS: [&str; 2] = ["education", "self_employed"];

/// A single loan application as received on the wire.
///
/// Unknown fields are rejected at the deserialization layer so that a
/// misspelled field never silently falls back to an imputed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoanApplication {
    pub no_of_dependents: f64,
    pub education: String,
    pub self_employed: String,
    pub income_annum: f64,
    pub loan_amount: f64,
    pub loan_term: f64,
    pub cibil_score: f64,
    pub residential_assets_value: f64,
    pub commercial_assets_value: f64,
    pub luxury_assets_value: f64,
    pub bank_asset_value: f64,
}

impl LoanApplication {
    /// Numeric field values in [`NUMERIC_FIELDS`] order.
    pub fn numeric_values(&self) -> [f64; 9] {
        [
            self.no_of_dependents,
            self.income_annum,
            self.loan_amount,
            self.loan_term,
            self.cibil_score,
            self.residential_assets_value,
            self.commercial_assets_value,
            self.luxury_assets_value,
            self.bank_asset_value,
        ]
    }

    /// Categorical field values in [`CATEGORICAL_FIELDS`] order.
    pub fn categorical_values(&self) -> [&str; 2] {
        [&self.education, &self.self_employed]
    }

    /// The synthetic neutral applicant used as the attribution baseline:
    /// all numeric fields at zero, modal categories for the rest.
    pub fn neutral() -> Self {
        Self {
            no_of_dependents: 0.0,
            education: "Graduate".to_string(),
            self_employed: "No".to_string(),
            income_annum: 0.0,
            loan_amount: 0.0,
            loan_term: 0.0,
            cibil_score: 0.0,
            residential_assets_value: 0.0,
            commercial_assets_value: 0.0,
            luxury_assets_value: 0.0,
            bank_asset_value: 0.0,
        }
    }
}

/// Computes a CRC32 hash over the transformed column names.
///
/// The hash is stored in the model artifact when the preprocessor is fitted
/// and recomputed at load time. A mismatch means the artifact was produced
/// against a different column layout and must not be served.
pub fn transformed_layout_hash(columns: &[String]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&[SCHEMA_VERSION]);
    for name in columns {
        hasher.update(name.as_bytes());
        // Separator byte so ["ab","c"] and ["a","bc"] hash differently.
        hasher.update(&[0xFF]);
    }
    hasher.finalize()
}

/// Index of a raw field name in [`RAW_FIELDS`], if present.
pub fn raw_field_index(name: &str) -> Option<usize> {
    RAW_FIELDS.iter().position(|&f| f == name)
}
