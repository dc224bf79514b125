//! Model artifact persistence.
//!
//! A fitted model ships as a single JSON bundle: preprocessor statistics,
//! the forest, and the transformed column layout it was trained against.
//! Everything needed to reproduce a score is inside the file; nothing is
//! resolved from the environment at scoring time.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::model::forest::RandomForest;
use crate::logic::model::preprocess::Preprocessor;
use crate::logic::schema;

/// Bumped on incompatible artifact format changes.
pub const ARTIFACT_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The artifact is missing, unreadable or fails validation. The service
    /// degrades to error responses instead of starting with a broken model.
    #[error("model artifact unavailable: {0}")]
    Unavailable(String),
    /// A transformed row does not line up with the layout the model was
    /// fitted against. Always a deployment defect, never a user error.
    #[error("transformed row has {actual} columns but the model expects {expected}")]
    SchemaMismatch { expected: usize, actual: usize },
}

/// The serialized model bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u8,
    pub trained_at: DateTime<Utc>,
    /// Raw schema the preprocessor consumes, recorded for auditability.
    pub raw_fields: Vec<String>,
    pub numeric_fields: Vec<String>,
    pub categorical_fields: Vec<String>,
    pub preprocessor: Preprocessor,
    pub forest: RandomForest,
    /// Transformed column names, frozen at fit time.
    pub transformed_columns: Vec<String>,
    /// CRC32 over `transformed_columns`, see [`schema::transformed_layout_hash`].
    pub layout_hash: u32,
}

impl ModelArtifact {
    /// Reads and validates an artifact from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ModelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| ModelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Writes the artifact via a temp file and rename, so a crashed trainer
    /// never leaves a torn bundle behind.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let body = serde_json::to_string_pretty(self)
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, body)
            .map_err(|e| ModelError::Unavailable(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, path)
            .map_err(|e| ModelError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Checks the bundle for internal consistency and for compatibility with
    /// the serving schema. Any failure here means the artifact must not be
    /// served; there is no partial acceptance.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != ARTIFACT_VERSION {
            return Err(ModelError::Unavailable(format!(
                "artifact version {} does not match supported version {}",
                self.version, ARTIFACT_VERSION
            )));
        }
        if self.numeric_fields != schema::NUMERIC_FIELDS
            || self.categorical_fields != schema::CATEGORICAL_FIELDS
        {
            return Err(ModelError::Unavailable(
                "artifact field tables do not match the serving schema".to_string(),
            ));
        }
        let width = self.preprocessor.output_width();
        if self.transformed_columns.len() != width {
            return Err(ModelError::Unavailable(format!(
                "artifact records {} transformed columns but the preprocessor emits {}",
                self.transformed_columns.len(),
                width
            )));
        }
        if self.forest.n_features != width {
            return Err(ModelError::Unavailable(format!(
                "forest was fitted on {} features but the preprocessor emits {}",
                self.forest.n_features, width
            )));
        }
        if self.preprocessor.column_names() != self.transformed_columns {
            return Err(ModelError::Unavailable(
                "recorded transformed columns do not match the preprocessor layout".to_string(),
            ));
        }
        let expected_hash = schema::transformed_layout_hash(&self.transformed_columns);
        if self.layout_hash != expected_hash {
            return Err(ModelError::Unavailable(format!(
                "layout hash mismatch: artifact {:08x}, computed {:08x}",
                self.layout_hash, expected_hash
            )));
        }
        self.forest.validate().map_err(ModelError::Unavailable)?;
        Ok(())
    }
}
