//! Offline training.
//!
//! Turns a labeled CSV into a model artifact: fit imputation and scaling
//! statistics, induce a bootstrap forest on the transformed rows, evaluate
//! on a holdout slice and bundle everything for the serving side. Nothing
//! here runs in the request path.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::logic::model::artifact::{ModelArtifact, ARTIFACT_VERSION};
use crate::logic::model::forest::{DecisionTree, RandomForest, TreeNode};
use crate::logic::model::preprocess::{CategoryMap, NumericStats, Preprocessor};
use crate::logic::model::threshold::{Decision, DecisionPolicy};
use crate::logic::schema::{self, LoanApplication};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("training data error: {0}")]
    Data(String),
}

/// Forest induction and split settings.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub trees: usize,
    pub max_depth: usize,
    /// Minimum samples on each side of a split.
    pub min_leaf: usize,
    pub seed: u64,
    /// Fraction of rows held out for evaluation.
    pub test_fraction: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { trees: 200, max_depth: 12, min_leaf: 2, seed: 42, test_fraction: 0.2 }
    }
}

/// Holdout evaluation summary. Positive class is "approved".
#[derive(Debug, Clone)]
pub struct EvalReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub accuracy: f64,
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Parsed training rows. `labels[i]` is true when row `i` was approved.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub applications: Vec<LoanApplication>,
    pub labels: Vec<bool>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}

// ===== CSV INGESTION =====

struct CsvColumns {
    no_of_dependents: usize,
    education: usize,
    self_employed: usize,
    income_annum: usize,
    loan_amount: usize,
    loan_term: usize,
    cibil_score: usize,
    residential_assets_value: usize,
    commercial_assets_value: usize,
    luxury_assets_value: usize,
    bank_asset_value: usize,
    loan_status: usize,
}

impl CsvColumns {
    /// Header names are trimmed and lowercased before matching, since the
    /// upstream export pads them with spaces.
    fn resolve(headers: &csv::StringRecord) -> Result<Self, TrainError> {
        let mut index = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            index.insert(name.trim().to_lowercase(), i);
        }
        let find = |name: &str| -> Result<usize, TrainError> {
            index
                .get(name)
                .copied()
                .ok_or_else(|| TrainError::Data(format!("missing column '{}'", name)))
        };
        Ok(Self {
            no_of_dependents: find("no_of_dependents")?,
            education: find("education")?,
            self_employed: find("self_employed")?,
            income_annum: find("income_annum")?,
            loan_amount: find("loan_amount")?,
            loan_term: find("loan_term")?,
            cibil_score: find("cibil_score")?,
            residential_assets_value: find("residential_assets_value")?,
            commercial_assets_value: find("commercial_assets_value")?,
            luxury_assets_value: find("luxury_assets_value")?,
            bank_asset_value: find("bank_asset_value")?,
            loan_status: find("loan_status")?,
        })
    }
}

/// Unparseable numeric cells become NaN and are median-imputed by the
/// fitted preprocessor, mirroring how the dataset is cleaned upstream.
fn numeric_cell(record: &csv::StringRecord, index: usize) -> f64 {
    record
        .get(index)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
        .unwrap_or(f64::NAN)
}

fn text_cell(record: &csv::StringRecord, index: usize) -> String {
    record.get(index).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn parse_label(record: &csv::StringRecord, index: usize) -> Option<bool> {
    let value = record.get(index)?.trim();
    if value.eq_ignore_ascii_case("approved") {
        Some(true)
    } else if value.eq_ignore_ascii_case("rejected") {
        Some(false)
    } else {
        None
    }
}

/// Loads a labeled CSV. Rows without a usable target label are dropped.
pub fn load_csv(path: &Path) -> Result<LabeledDataset, TrainError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let columns = CsvColumns::resolve(&headers)?;

    let mut applications = Vec::new();
    let mut labels = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        let record = result?;
        let label = match parse_label(&record, columns.loan_status) {
            Some(label) => label,
            None => {
                skipped += 1;
                continue;
            }
        };
        applications.push(LoanApplication {
            no_of_dependents: numeric_cell(&record, columns.no_of_dependents),
            education: text_cell(&record, columns.education),
            self_employed: text_cell(&record, columns.self_employed),
            income_annum: numeric_cell(&record, columns.income_annum),
            loan_amount: numeric_cell(&record, columns.loan_amount),
            loan_term: numeric_cell(&record, columns.loan_term),
            cibil_score: numeric_cell(&record, columns.cibil_score),
            residential_assets_value: numeric_cell(&record, columns.residential_assets_value),
            commercial_assets_value: numeric_cell(&record, columns.commercial_assets_value),
            luxury_assets_value: numeric_cell(&record, columns.luxury_assets_value),
            bank_asset_value: numeric_cell(&record, columns.bank_asset_value),
        });
        labels.push(label);
    }
    if skipped > 0 {
        tracing::warn!("Dropped {} rows without a usable loan_status label", skipped);
    }
    if applications.is_empty() {
        return Err(TrainError::Data("no labeled rows in the training file".to_string()));
    }
    Ok(LabeledDataset { applications, labels })
}

// ===== PREPROCESSOR FIT =====

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Fits imputation and scaling statistics on the training slice.
///
/// Numeric medians come from observed values only; mean and standard
/// deviation are then computed over the imputed column, matching the
/// impute-then-scale order the serving transform replays.
pub fn fit_preprocessor(applications: &[LoanApplication]) -> Preprocessor {
    let numeric = schema::NUMERIC_FIELDS
        .iter()
        .enumerate()
        .map(|(i, &name)| {
            let mut observed: Vec<f64> = applications
                .iter()
                .map(|a| a.numeric_values()[i])
                .filter(|v| !v.is_nan())
                .collect();
            observed.sort_by(|a, b| a.total_cmp(b));
            let median = median_of_sorted(&observed);

            let imputed: Vec<f64> = applications
                .iter()
                .map(|a| {
                    let v = a.numeric_values()[i];
                    if v.is_nan() {
                        median
                    } else {
                        v
                    }
                })
                .collect();
            let count = imputed.len().max(1) as f64;
            let mean = imputed.iter().sum::<f64>() / count;
            let variance = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
            NumericStats { name: name.to_string(), median, mean, std: variance.sqrt() }
        })
        .collect();

    let categorical = schema::CATEGORICAL_FIELDS
        .iter()
        .enumerate()
        .map(|(j, &name)| {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for application in applications {
                let value = application.categorical_values()[j].trim();
                if !value.is_empty() {
                    *counts.entry(value.to_string()).or_default() += 1;
                }
            }
            let mut categories: Vec<String> = counts.keys().cloned().collect();
            categories.sort();
            // First strictly-greater count wins, so ties pick the
            // lexicographically smallest category.
            let mut mode = String::new();
            let mut best = 0usize;
            for category in &categories {
                let count = counts[category];
                if count > best {
                    best = count;
                    mode = category.clone();
                }
            }
            CategoryMap { name: name.to_string(), mode, categories }
        })
        .collect();

    Preprocessor { numeric, categorical }
}

fn transform_matrix(
    preprocessor: &Preprocessor,
    applications: &[LoanApplication],
) -> Result<Array2<f64>, TrainError> {
    let width = preprocessor.output_width();
    let mut data = Vec::with_capacity(applications.len() * width);
    for application in applications {
        data.extend(preprocessor.transform(application).iter().copied());
    }
    Array2::from_shape_vec((applications.len(), width), data)
        .map_err(|e| TrainError::Data(e.to_string()))
}

// ===== FOREST INDUCTION =====

fn gini(total: usize, positives: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

fn weighted_gini(
    left_n: usize,
    left_pos: usize,
    right_n: usize,
    right_pos: usize,
) -> f64 {
    let total = (left_n + right_n) as f64;
    (left_n as f64 * gini(left_n, left_pos) + right_n as f64 * gini(right_n, right_pos)) / total
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a [bool],
    max_depth: usize,
    min_leaf: usize,
    feature_subset: usize,
    nodes: Vec<TreeNode>,
}

impl<'a> TreeBuilder<'a> {
    fn push_leaf(&mut self, prob: f64) -> usize {
        self.nodes.push(TreeNode::Leaf { prob });
        self.nodes.len() - 1
    }

    /// Grows a subtree over `samples` and returns its root index. The split
    /// node slot is reserved before recursing so children always sit at
    /// higher indices than their parent.
    fn grow(&mut self, samples: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let positives = samples.iter().filter(|&&i| self.y[i]).count();
        let prob = positives as f64 / samples.len() as f64;
        let pure = positives == 0 || positives == samples.len();
        if depth >= self.max_depth || pure || samples.len() < self.min_leaf * 2 {
            return self.push_leaf(prob);
        }
        let Some((feature, threshold)) = self.best_split(&samples, rng) else {
            return self.push_leaf(prob);
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) =
            samples.into_iter().partition(|&i| self.x[[i, feature]] <= threshold);

        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { prob });
        let left = self.grow(left_samples, depth + 1, rng);
        let right = self.grow(right_samples, depth + 1, rng);
        self.nodes[index] = TreeNode::Split { feature, threshold, left, right };
        index
    }

    /// Best gini split over a random feature subset, or `None` when no
    /// candidate reduces impurity.
    fn best_split(&self, samples: &[usize], rng: &mut StdRng) -> Option<(usize, f64)> {
        let total = samples.len();
        let total_pos = samples.iter().filter(|&&i| self.y[i]).count();

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);
        features.truncate(self.feature_subset.max(1));

        let mut best_score = f64::INFINITY;
        let mut best = None;
        let mut sorted: Vec<(f64, bool)> = Vec::with_capacity(total);
        for &feature in &features {
            sorted.clear();
            sorted.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_n = 0usize;
            let mut left_pos = 0usize;
            for k in 0..total - 1 {
                left_n += 1;
                if sorted[k].1 {
                    left_pos += 1;
                }
                // A boundary only exists between distinct values.
                if sorted[k].0 == sorted[k + 1].0 {
                    continue;
                }
                if left_n < self.min_leaf || total - left_n < self.min_leaf {
                    continue;
                }
                let threshold = (sorted[k].0 + sorted[k + 1].0) / 2.0;
                // Adjacent floats can round the midpoint onto the right
                // value, which would send every sample left.
                if threshold >= sorted[k + 1].0 {
                    continue;
                }
                let score = weighted_gini(left_n, left_pos, total - left_n, total_pos - left_pos);
                if score < best_score {
                    best_score = score;
                    best = Some((feature, threshold));
                }
            }
        }

        if best_score < gini(total, total_pos) - 1e-12 {
            best
        } else {
            None
        }
    }
}

/// Trains a bootstrap forest on transformed rows. Each tree samples rows
/// with replacement and considers sqrt(width) random features per split.
pub fn train_forest(
    x: &Array2<f64>,
    y: &[bool],
    config: &TrainConfig,
    rng: &mut StdRng,
) -> RandomForest {
    let rows = x.nrows();
    let feature_subset = ((x.ncols() as f64).sqrt().floor() as usize).max(1);
    let mut trees = Vec::with_capacity(config.trees);
    for _ in 0..config.trees {
        let samples: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
        let mut builder = TreeBuilder {
            x,
            y,
            max_depth: config.max_depth.max(1),
            min_leaf: config.min_leaf.max(1),
            feature_subset,
            nodes: Vec::new(),
        };
        builder.grow(samples, 0, rng);
        trees.push(DecisionTree { nodes: builder.nodes });
    }
    RandomForest { n_features: x.ncols(), trees }
}

// ===== END-TO-END TRAINING =====

/// Fits the full artifact from a labeled dataset and evaluates it on a
/// holdout slice. The preprocessor and forest only ever see training rows.
pub fn train_artifact(
    dataset: &LabeledDataset,
    config: &TrainConfig,
) -> Result<(ModelArtifact, EvalReport), TrainError> {
    if dataset.is_empty() {
        return Err(TrainError::Data("cannot train on an empty dataset".to_string()));
    }
    if config.trees == 0 {
        return Err(TrainError::Data("at least one tree is required".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    indices.shuffle(&mut rng);
    let test_len =
        ((dataset.len() as f64 * config.test_fraction).round() as usize).min(dataset.len() - 1);
    let (test_idx, train_idx) = indices.split_at(test_len);

    let train_apps: Vec<LoanApplication> =
        train_idx.iter().map(|&i| dataset.applications[i].clone()).collect();
    let train_labels: Vec<bool> = train_idx.iter().map(|&i| dataset.labels[i]).collect();
    tracing::debug!("Split dataset: {} train rows, {} holdout rows", train_apps.len(), test_idx.len());

    let preprocessor = fit_preprocessor(&train_apps);
    let x = transform_matrix(&preprocessor, &train_apps)?;
    let forest = train_forest(&x, &train_labels, config, &mut rng);

    let policy = DecisionPolicy::default();
    let (mut tp, mut tn, mut fp, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    for &i in test_idx {
        let row = preprocessor.transform(&dataset.applications[i]);
        let predicted = policy.decide(forest.predict_proba(row.view())) == Decision::Approved;
        match (predicted, dataset.labels[i]) {
            (true, true) => tp += 1,
            (false, false) => tn += 1,
            (true, false) => fp += 1,
            (false, true) => fn_ += 1,
        }
    }
    let report = EvalReport {
        train_rows: train_apps.len(),
        test_rows: test_idx.len(),
        accuracy: if test_idx.is_empty() {
            f64::NAN
        } else {
            (tp + tn) as f64 / test_idx.len() as f64
        },
        true_positives: tp,
        true_negatives: tn,
        false_positives: fp,
        false_negatives: fn_,
    };

    let transformed_columns = preprocessor.column_names();
    let layout_hash = schema::transformed_layout_hash(&transformed_columns);
    let artifact = ModelArtifact {
        version: ARTIFACT_VERSION,
        trained_at: Utc::now(),
        raw_fields: schema::RAW_FIELDS.iter().map(|s| s.to_string()).collect(),
        numeric_fields: schema::NUMERIC_FIELDS.iter().map(|s| s.to_string()).collect(),
        categorical_fields: schema::CATEGORICAL_FIELDS.iter().map(|s| s.to_string()).collect(),
        preprocessor,
        forest,
        transformed_columns,
        layout_hash,
    };
    artifact.validate().map_err(|e| TrainError::Data(e.to_string()))?;
    Ok((artifact, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "loan_id, no_of_dependents, education, self_employed, income_annum,\
             loan_amount, loan_term, cibil_score, residential_assets_value,\
             commercial_assets_value, luxury_assets_value, bank_asset_value, loan_status"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    }

    /// Synthetic applicants whose approval depends only on the cibil score.
    fn synthetic_dataset(rows: usize, seed: u64) -> LabeledDataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut applications = Vec::with_capacity(rows);
        let mut labels = Vec::with_capacity(rows);
        for _ in 0..rows {
            let cibil = rng.gen_range(300.0..900.0);
            applications.push(LoanApplication {
                no_of_dependents: rng.gen_range(0.0f64..5.0).floor(),
                education: if rng.gen_bool(0.6) { "Graduate" } else { "Not Graduate" }.to_string(),
                self_employed: if rng.gen_bool(0.3) { "Yes" } else { "No" }.to_string(),
                income_annum: rng.gen_range(200_000.0..9_900_000.0),
                loan_amount: rng.gen_range(300_000.0..30_000_000.0),
                loan_term: rng.gen_range(2.0f64..20.0).floor(),
                cibil_score: cibil,
                residential_assets_value: rng.gen_range(0.0..20_000_000.0),
                commercial_assets_value: rng.gen_range(0.0..10_000_000.0),
                luxury_assets_value: rng.gen_range(0.0..30_000_000.0),
                bank_asset_value: rng.gen_range(0.0..10_000_000.0),
            });
            labels.push(cibil >= 550.0);
        }
        LabeledDataset { applications, labels }
    }

    #[test]
    fn test_load_csv_parses_padded_headers_and_labels() {
        let file = write_csv(&[
            "1, 2, Graduate, No, 5000000, 10000000, 10, 750, 5000000, 1000000, 2000000, 3000000, Approved",
            "2, 0, Not Graduate, Yes, 3000000, 8000000, 8, 400, 2000000, 500000, 700000, 900000, rejected",
        ]);
        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels, vec![true, false]);
        assert_eq!(dataset.applications[0].cibil_score, 750.0);
        assert_eq!(dataset.applications[1].education, "Not Graduate");
    }

    #[test]
    fn test_load_csv_coerces_bad_numerics_to_nan() {
        let file = write_csv(&[
            "1, 2, Graduate, No, n/a, 10000000, 10, 750, 5000000, 1000000, 2000000, 3000000, Approved",
        ]);
        let dataset = load_csv(file.path()).unwrap();
        assert!(dataset.applications[0].income_annum.is_nan());
    }

    #[test]
    fn test_load_csv_drops_unlabeled_rows() {
        let file = write_csv(&[
            "1, 2, Graduate, No, 5000000, 10000000, 10, 750, 5000000, 1000000, 2000000, 3000000, Approved",
            "2, 2, Graduate, No, 5000000, 10000000, 10, 750, 5000000, 1000000, 2000000, 3000000, maybe",
        ]);
        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_load_csv_missing_column_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "loan_id,cibil_score").unwrap();
        writeln!(file, "1,700").unwrap();
        file.flush().unwrap();
        assert!(matches!(load_csv(file.path()), Err(TrainError::Data(_))));
    }

    #[test]
    fn test_median_of_sorted() {
        assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(median_of_sorted(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(median_of_sorted(&[]), 0.0);
    }

    #[test]
    fn test_fit_preprocessor_statistics() {
        let mut applications = Vec::new();
        for (cibil, education) in
            [(400.0, "Graduate"), (600.0, "Graduate"), (f64::NAN, "Not Graduate")]
        {
            applications.push(LoanApplication {
                cibil_score: cibil,
                education: education.to_string(),
                ..LoanApplication::neutral()
            });
        }
        let pre = fit_preprocessor(&applications);
        let cibil = pre.numeric.iter().find(|s| s.name == "cibil_score").unwrap();
        // Median of observed {400, 600} imputes the NaN row.
        assert_eq!(cibil.median, 500.0);
        assert_eq!(cibil.mean, 500.0);

        let education = pre.categorical.iter().find(|c| c.name == "education").unwrap();
        assert_eq!(education.mode, "Graduate");
        assert_eq!(education.categories, vec!["Graduate", "Not Graduate"]);
    }

    #[test]
    fn test_forest_learns_a_separable_rule() {
        let dataset = synthetic_dataset(200, 9);
        let pre = fit_preprocessor(&dataset.applications);
        let x = transform_matrix(&pre, &dataset.applications).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let config = TrainConfig { trees: 25, max_depth: 8, ..TrainConfig::default() };
        let forest = train_forest(&x, &dataset.labels, &config, &mut rng);

        let high = pre.transform(&LoanApplication {
            cibil_score: 850.0,
            ..dataset.applications[0].clone()
        });
        let low = pre.transform(&LoanApplication {
            cibil_score: 320.0,
            ..dataset.applications[0].clone()
        });
        assert!(forest.predict_proba(high.view()) > 0.7);
        assert!(forest.predict_proba(low.view()) < 0.3);
    }

    #[test]
    fn test_train_artifact_end_to_end() {
        let dataset = synthetic_dataset(300, 17);
        let config = TrainConfig { trees: 30, max_depth: 8, ..TrainConfig::default() };
        let (artifact, report) = train_artifact(&dataset, &config).unwrap();
        assert!(artifact.validate().is_ok());
        assert_eq!(report.train_rows + report.test_rows, 300);
        assert!(report.test_rows > 0);
        assert!(report.accuracy > 0.8, "accuracy {}", report.accuracy);
    }

    #[test]
    fn test_training_is_deterministic_for_a_seed() {
        let dataset = synthetic_dataset(120, 3);
        let config = TrainConfig { trees: 10, max_depth: 6, ..TrainConfig::default() };
        let (first, _) = train_artifact(&dataset, &config).unwrap();
        let (second, _) = train_artifact(&dataset, &config).unwrap();
        assert_eq!(
            serde_json::to_string(&first.forest).unwrap(),
            serde_json::to_string(&second.forest).unwrap()
        );
    }

    #[test]
    fn test_train_rejects_empty_dataset() {
        let dataset = LabeledDataset { applications: Vec::new(), labels: Vec::new() };
        assert!(matches!(
            train_artifact(&dataset, &TrainConfig::default()),
            Err(TrainError::Data(_))
        ));
    }
}
