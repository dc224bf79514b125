//! The scoring service.
//!
//! One immutable object owns the fitted preprocessor, the forest, the
//! decision policy and the attribution engine. All alignment between the
//! transformed layout, the background set and the forest is proven once at
//! construction; request handling never re-checks it.

use std::path::Path;

use ndarray::{Array1, Array2};

use crate::logic::explain::engine::{ExplainerConfig, PermutationExplainer};
use crate::logic::explain::format::{format_drivers, DEFAULT_TOP_K};
use crate::logic::explain::types::Driver;
use crate::logic::model::artifact::{ModelArtifact, ModelError};
use crate::logic::model::forest::RandomForest;
use crate::logic::model::preprocess::Preprocessor;
use crate::logic::model::threshold::{Decision, DecisionPolicy};
use crate::logic::schema::LoanApplication;

/// Result of scoring one application.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub decision: Decision,
    /// `None` when the classifier produced no usable probability.
    pub probability: Option<f64>,
    /// Ranked drivers, empty for `Error` outcomes.
    pub drivers: Vec<Driver>,
}

/// Immutable scoring pipeline shared across request handlers.
#[derive(Debug)]
pub struct ScoringService {
    preprocessor: Preprocessor,
    forest: RandomForest,
    policy: DecisionPolicy,
    transformed_columns: Vec<String>,
    explainer: PermutationExplainer,
    baseline: f64,
}

impl ScoringService {
    /// Loads an artifact from disk and assembles the service.
    pub fn load(path: &Path, config: ExplainerConfig) -> Result<Self, ModelError> {
        let artifact = ModelArtifact::load(path)?;
        let service = Self::from_artifact(artifact, config)?;
        tracing::info!(
            "Scoring service ready: {} columns, {} trees, baseline {:.4}",
            service.transformed_columns.len(),
            service.forest.trees.len(),
            service.baseline
        );
        Ok(service)
    }

    /// Assembles the service from an already-validated artifact.
    ///
    /// The background set is a single transformed neutral applicant. Its
    /// width is checked against the recorded layout here; a violation means
    /// the build is broken and the service refuses to come up.
    pub fn from_artifact(
        artifact: ModelArtifact,
        config: ExplainerConfig,
    ) -> Result<Self, ModelError> {
        artifact.validate()?;
        let ModelArtifact { preprocessor, forest, transformed_columns, .. } = artifact;

        let neutral = preprocessor.transform(&LoanApplication::neutral());
        if neutral.len() != transformed_columns.len() {
            return Err(ModelError::Unavailable(format!(
                "background row has {} columns but the layout records {}",
                neutral.len(),
                transformed_columns.len()
            )));
        }
        let width = neutral.len();
        let background = Array2::from_shape_vec((1, width), neutral.to_vec())
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let explainer = PermutationExplainer::new(background, config);
        let baseline = explainer.baseline(|row| forest.predict_proba(row));
        Ok(Self {
            preprocessor,
            forest,
            policy: DecisionPolicy::default(),
            transformed_columns,
            explainer,
            baseline,
        })
    }

    /// Scores one application: transform, classify, decide, attribute.
    ///
    /// An `Error` decision short-circuits attribution and returns an empty
    /// driver list. Schema mismatches inside attribution surface as errors
    /// rather than fabricated explanations.
    pub fn score(&self, application: &LoanApplication) -> Result<ScoreOutcome, ModelError> {
        let row = self.preprocessor.transform(application);
        let probability = self.forest.predict_proba(row.view());
        let decision = self.policy.decide(probability);
        if decision == Decision::Error {
            tracing::warn!("Classifier produced no usable probability, skipping attribution");
            return Ok(ScoreOutcome { decision, probability: None, drivers: Vec::new() });
        }

        let scores =
            self.explainer.attribute(row.view(), |coalition| self.forest.predict_proba(coalition))?;
        let drivers = format_drivers(scores.view(), &self.transformed_columns, DEFAULT_TOP_K);
        Ok(ScoreOutcome { decision, probability: Some(probability), drivers })
    }

    /// Full contribution vector for one application, for diagnostics and
    /// offline analysis. The HTTP surface only ever exposes the ranked top
    /// drivers from [`score`].
    ///
    /// [`score`]: ScoringService::score
    pub fn attributions(&self, application: &LoanApplication) -> Result<Array1<f64>, ModelError> {
        let row = self.preprocessor.transform(application);
        self.explainer.attribute(row.view(), |coalition| self.forest.predict_proba(coalition))
    }

    pub fn transformed_columns(&self) -> &[String] {
        &self.transformed_columns
    }

    /// Mean classifier output over the background set.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::artifact::ARTIFACT_VERSION;
    use crate::logic::model::forest::{DecisionTree, TreeNode};
    use crate::logic::model::preprocess::{CategoryMap, NumericStats};
    use crate::logic::schema;
    use chrono::Utc;

    /// Identity-scaled preprocessor plus a forest that splits only on the
    /// cibil score: <= 500 scores 0.1, above scores 0.9.
    fn cibil_artifact(trees: usize) -> ModelArtifact {
        let numeric = schema::NUMERIC_FIELDS
            .iter()
            .map(|&name| NumericStats {
                name: name.to_string(),
                median: 0.0,
                mean: 0.0,
                std: 1.0,
            })
            .collect();
        let categorical = vec![
            CategoryMap {
                name: "education".to_string(),
                mode: "Graduate".to_string(),
                categories: vec!["Graduate".to_string(), "Not Graduate".to_string()],
            },
            CategoryMap {
                name: "self_employed".to_string(),
                mode: "No".to_string(),
                categories: vec!["No".to_string(), "Yes".to_string()],
            },
        ];
        let preprocessor = Preprocessor { numeric, categorical };
        let transformed_columns = preprocessor.column_names();
        let cibil_index = transformed_columns.iter().position(|c| c == "cibil_score").unwrap();
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split { feature: cibil_index, threshold: 500.0, left: 1, right: 2 },
                TreeNode::Leaf { prob: 0.1 },
                TreeNode::Leaf { prob: 0.9 },
            ],
        };
        let forest = RandomForest {
            n_features: transformed_columns.len(),
            trees: vec![tree; trees],
        };
        let layout_hash = schema::transformed_layout_hash(&transformed_columns);
        ModelArtifact {
            version: ARTIFACT_VERSION,
            trained_at: Utc::now(),
            raw_fields: schema::RAW_FIELDS.iter().map(|s| s.to_string()).collect(),
            numeric_fields: schema::NUMERIC_FIELDS.iter().map(|s| s.to_string()).collect(),
            categorical_fields: schema::CATEGORICAL_FIELDS.iter().map(|s| s.to_string()).collect(),
            preprocessor,
            forest,
            transformed_columns,
            layout_hash,
        }
    }

    fn service(trees: usize) -> ScoringService {
        let config = ExplainerConfig { permutations: 8, seed: Some(42) };
        ScoringService::from_artifact(cibil_artifact(trees), config).unwrap()
    }

    fn applicant(cibil: f64) -> LoanApplication {
        LoanApplication { cibil_score: cibil, ..LoanApplication::neutral() }
    }

    #[test]
    fn test_high_cibil_is_approved() {
        let outcome = service(3).score(&applicant(750.0)).unwrap();
        assert_eq!(outcome.decision, Decision::Approved);
        assert_eq!(outcome.probability, Some(0.9));
        assert!(!outcome.drivers.is_empty());
        assert!(outcome.drivers.len() <= 5);
    }

    #[test]
    fn test_low_cibil_is_rejected() {
        let outcome = service(3).score(&applicant(300.0)).unwrap();
        assert_eq!(outcome.decision, Decision::Rejected);
        assert_eq!(outcome.probability, Some(0.1));
    }

    #[test]
    fn test_cibil_dominates_drivers_when_it_flips_the_tree() {
        // Background cibil is 0, the applicant crosses the split, so the
        // whole probability move is credited to the cibil column.
        let outcome = service(1).score(&applicant(750.0)).unwrap();
        let top = &outcome.drivers[0];
        assert_eq!(top.label, "Cibil Score");
        assert!((top.score - 0.8).abs() < 1e-9);
        for driver in &outcome.drivers[1..] {
            assert_eq!(driver.score, 0.0);
        }
    }

    #[test]
    fn test_attributions_satisfy_completeness() {
        let svc = service(1);
        let app = applicant(640.0);
        let scores = svc.attributions(&app).unwrap();
        let outcome = svc.score(&app).unwrap();
        let total: f64 = scores.iter().sum();
        let expected = outcome.probability.unwrap() - svc.baseline();
        assert!((total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_empty_forest_degrades_to_error_outcome() {
        let outcome = service(0).score(&applicant(750.0)).unwrap();
        assert_eq!(outcome.decision, Decision::Error);
        assert_eq!(outcome.probability, None);
        assert!(outcome.drivers.is_empty());
    }

    #[test]
    fn test_baseline_matches_background_routing() {
        // Neutral background has cibil 0, routing to the 0.1 leaf.
        assert!((service(2).baseline() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_from_artifact_rejects_invalid_bundle() {
        let mut artifact = cibil_artifact(1);
        artifact.layout_hash ^= 1;
        let err = ScoringService::from_artifact(artifact, ExplainerConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::Unavailable(_)));
    }
}
