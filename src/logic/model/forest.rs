//! Decision forest evaluated as plain data.
//!
//! Trees are stored as flat node arrays inside the model artifact, so the
//! serving path carries no training machinery. The positive class is
//! "approved"; a leaf holds the fraction of approved training samples that
//! reached it.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One node of a binary decision tree. Child fields hold indices into the
/// owning tree's node vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split { feature: usize, threshold: f64, left: usize, right: usize },
    Leaf { prob: f64 },
}

/// A single trained tree. Node 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walks the tree for one transformed row. Split condition is
    /// `row[feature] <= threshold` goes left, matching how the trainer
    /// partitions samples.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> f64 {
        let mut index = 0usize;
        loop {
            match self.nodes[index] {
                TreeNode::Leaf { prob } => return prob,
                TreeNode::Split { feature, threshold, left, right } => {
                    index = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    /// Checks node references and feature indices against the expected row
    /// width. Run once at artifact load so the walk above can index freely.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { feature, threshold, left, right } = node {
                if *feature >= n_features {
                    return Err(format!(
                        "node {} references feature {} but rows have {} columns",
                        i, feature, n_features
                    ));
                }
                if threshold.is_nan() {
                    return Err(format!("node {} has a NaN threshold", i));
                }
                if *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {} has an out-of-range child", i));
                }
                if *left <= i || *right <= i {
                    return Err(format!("node {} has a non-forward child reference", i));
                }
            }
        }
        Ok(())
    }
}

/// An ensemble of trees whose probabilities are averaged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Mean approval probability across all trees.
    ///
    /// An empty ensemble yields NaN, which the decision policy maps to an
    /// `Error` outcome instead of a spurious approval or rejection.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict_proba(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features).map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}
