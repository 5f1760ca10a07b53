//! Random Forest evaluation.
//!
//! The fitted ensemble is the training-side artifact only: it has no
//! browser-portable form and is used to label the synthetic inputs the
//! exported network is trained on. Trees are flat node arrays walked
//! iteratively, with out-of-bounds indices treated as a zero leaf
//! rather than a panic.

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

/// A decision tree node (internal or leaf).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Feature index compared at internal nodes
    pub feature_index: u16,
    /// Split threshold; rows with value <= threshold go left
    pub threshold: f64,
    /// Index of the left child
    pub left: u32,
    /// Index of the right child
    pub right: u32,
    /// Leaf prediction (None for internal nodes)
    pub value: Option<f64>,
}

/// A single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk the tree for one feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;
        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };
            if let Some(value) = node.value {
                return value;
            }
            let feature_idx = node.feature_index as usize;
            if feature_idx >= features.len() {
                return 0.0;
            }
            idx = if features[feature_idx] <= node.threshold {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }
}

/// Fitted Random Forest: bootstrap-resampled trees averaged together,
/// with impurity-decrease feature importances keyed by column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<Tree>,
    pub feature_names: Vec<String>,
    pub feature_importances: Vec<f64>,
}

impl ForestModel {
    /// Ensemble prediction: mean of the per-tree outputs.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            return Err(ModelError::FeatureSizeMismatch {
                expected: self.feature_names.len(),
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Ok(0.0);
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predictions for a batch of rows.
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// (name, importance) pairs sorted descending by importance.
    pub fn ranked_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(value: f64) -> Node {
        Node {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    fn stump(threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node {
                    feature_index: 0,
                    threshold,
                    left: 1,
                    right: 2,
                    value: None,
                },
                leaf(low),
                leaf(high),
            ],
        }
    }

    #[test]
    fn test_tree_branches() {
        let tree = stump(5.0, 10.0, 20.0);
        assert_eq!(tree.predict(&[3.0]), 10.0);
        assert_eq!(tree.predict(&[5.0]), 10.0); // boundary goes left
        assert_eq!(tree.predict(&[7.0]), 20.0);
    }

    #[test]
    fn test_tree_out_of_bounds_feature_is_zero() {
        let tree = stump(5.0, 10.0, 20.0);
        assert_eq!(tree.predict(&[]), 0.0);
    }

    #[test]
    fn test_forest_averages_trees() {
        let model = ForestModel {
            trees: vec![stump(5.0, 10.0, 20.0), stump(5.0, 30.0, 40.0)],
            feature_names: vec!["distance".into()],
            feature_importances: vec![1.0],
        };
        assert_eq!(model.predict(&[1.0]).unwrap(), 20.0);
        assert_eq!(model.predict(&[9.0]).unwrap(), 30.0);
    }

    #[test]
    fn test_forest_rejects_wrong_width() {
        let model = ForestModel {
            trees: vec![stump(5.0, 10.0, 20.0)],
            feature_names: vec!["distance".into()],
            feature_importances: vec![1.0],
        };
        assert!(model.predict(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_ranked_importances() {
        let model = ForestModel {
            trees: vec![],
            feature_names: vec!["a".into(), "b".into(), "c".into()],
            feature_importances: vec![0.2, 0.5, 0.3],
        };
        let ranked = model.ranked_importances();
        assert_eq!(ranked[0].0, "b");
        assert_eq!(ranked[1].0, "c");
        assert_eq!(ranked[2].0, "a");
    }
}
