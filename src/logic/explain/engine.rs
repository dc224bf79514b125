//! Permutation-based feature attribution.
//!
//! Estimates per-feature Shapley contributions by sampling random feature
//! orderings. For each ordering, features of the instance are switched on
//! one at a time over the background set and the change in the model's mean
//! output is credited to the switched feature. Averaging over orderings
//! yields the contribution vector.
//!
//! Each sampled ordering telescopes: the per-ordering credits sum exactly to
//! `f(instance) - baseline`, so the averaged vector satisfies the same
//! completeness identity up to floating-point rounding.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::logic::model::ModelError;

/// Tuning knobs for the attribution estimate.
#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    /// Number of random orderings to sample. More orderings tighten the
    /// estimate at a linear cost in model evaluations.
    pub permutations: usize,
    /// Fixed seed for reproducible attributions; `None` draws from OS
    /// entropy on every call.
    pub seed: Option<u64>,
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self { permutations: 25, seed: None }
    }
}

/// Attribution engine bound to a background set.
///
/// The engine treats the model as a black-box scoring function over
/// transformed rows; it knows nothing about raw fields or preprocessing.
#[derive(Debug)]
pub struct PermutationExplainer {
    background: Array2<f64>,
    config: ExplainerConfig,
}

impl PermutationExplainer {
    pub fn new(background: Array2<f64>, config: ExplainerConfig) -> Self {
        Self { background, config }
    }

    /// Width of the transformed rows this engine expects.
    pub fn width(&self) -> usize {
        self.background.ncols()
    }

    /// Mean model output over the background set, the reference point all
    /// contributions are measured from.
    pub fn baseline<F>(&self, predict: F) -> f64
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        mean_prediction(&self.background, &predict)
    }

    /// Estimates a contribution vector for one transformed row.
    ///
    /// Cost is `permutations * width * background_rows` model evaluations,
    /// plus one per ordering for the starting point.
    pub fn attribute<F>(&self, row: ArrayView1<f64>, predict: F) -> Result<Array1<f64>, ModelError>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        let width = self.width();
        if row.len() != width {
            return Err(ModelError::SchemaMismatch { expected: width, actual: row.len() });
        }

        let rounds = self.config.permutations.max(1);
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut totals = Array1::<f64>::zeros(width);
        let mut order: Vec<usize> = (0..width).collect();
        for _ in 0..rounds {
            order.shuffle(&mut rng);
            // Coalition rows start as pure background; columns flip to the
            // instance value in permutation order.
            let mut coalition = self.background.clone();
            let mut previous = mean_prediction(&coalition, &predict);
            for &column in &order {
                for mut bg_row in coalition.rows_mut() {
                    bg_row[column] = row[column];
                }
                let current = mean_prediction(&coalition, &predict);
                totals[column] += current - previous;
                previous = current;
            }
        }

        Ok(totals / rounds as f64)
    }
}

fn mean_prediction<F>(rows: &Array2<f64>, predict: &F) -> f64
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    let n = rows.nrows();
    if n == 0 {
        return f64::NAN;
    }
    let total: f64 = rows.rows().into_iter().map(|row| predict(row)).sum();
    total / n as f64
}
