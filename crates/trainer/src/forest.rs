//! Random Forest trainer.
//!
//! Bootstrap-resampled CART trees fitted in parallel. Each tree draws
//! its resample from an RNG seeded by the run seed plus the tree index,
//! so the fitted ensemble is identical regardless of how rayon
//! schedules the work.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::info;
use tripcost_model::ForestModel;

use crate::cart::{CartBuilder, TreeConfig};
use crate::errors::{Result, TrainerError};

/// Forest training configuration.
#[derive(Clone, Debug)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

/// Fits Random Forest regressors.
pub struct ForestTrainer {
    config: ForestConfig,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Fit a forest on the feature matrix and label vector.
    pub fn train(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<ForestModel> {
        if features.is_empty() {
            return Err(TrainerError::Training("empty feature matrix".into()));
        }
        if features.len() != targets.len() {
            return Err(TrainerError::Training(format!(
                "feature/label row mismatch: {} vs {}",
                features.len(),
                targets.len()
            )));
        }
        let feature_count = features[0].len();
        if feature_names.len() != feature_count {
            return Err(TrainerError::Training(format!(
                "feature name count {} does not match matrix width {}",
                feature_names.len(),
                feature_count
            )));
        }

        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
        };
        let n = features.len();

        let fitted: Vec<(tripcost_model::Tree, Vec<f64>)> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng =
                    StdRng::seed_from_u64(self.config.seed.wrapping_add(tree_idx as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let builder = CartBuilder::new(features, targets, tree_config.clone());
                builder.build(&indices)
            })
            .collect();

        // Average per-tree normalized importances, then renormalize so
        // the reported scores sum to 1.
        let mut importances = vec![0.0; feature_count];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, tree_importances) in fitted {
            let total: f64 = tree_importances.iter().sum();
            if total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&tree_importances) {
                    *acc += v / total;
                }
            }
            trees.push(tree);
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        info!(
            trees = trees.len(),
            features = feature_count,
            samples = n,
            "forest fitted"
        );

        Ok(ForestModel {
            trees,
            feature_names: feature_names.to_vec(),
            feature_importances: importances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64, (i % 7) as f64])
            .collect();
        let targets: Vec<f64> = (0..n).map(|i| 3.0 * i as f64 + 5.0).collect();
        let names = vec!["distance".to_string(), "noise".to_string()];
        (features, targets, names)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 10,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    #[test]
    fn test_forest_learns_monotone_signal() {
        let (features, targets, names) = linear_data(100);
        let model = ForestTrainer::new(small_config())
            .train(&features, &targets, &names)
            .unwrap();

        let low = model.predict(&[10.0, 3.0]).unwrap();
        let high = model.predict(&[90.0, 3.0]).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_importances_normalized_and_signal_dominant() {
        let (features, targets, names) = linear_data(100);
        let model = ForestTrainer::new(small_config())
            .train(&features, &targets, &names)
            .unwrap();

        let sum: f64 = model.feature_importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(model.feature_importances[0] > model.feature_importances[1]);
    }

    #[test]
    fn test_same_seed_identical_model() {
        let (features, targets, names) = linear_data(60);
        let trainer = ForestTrainer::new(small_config());
        let m1 = trainer.train(&features, &targets, &names).unwrap();
        let m2 = trainer.train(&features, &targets, &names).unwrap();

        assert_eq!(m1.trees, m2.trees);
        assert_eq!(m1.feature_importances, m2.feature_importances);
    }

    #[test]
    fn test_mismatched_rows_rejected() {
        let (features, mut targets, names) = linear_data(10);
        targets.pop();
        let err = ForestTrainer::new(small_config())
            .train(&features, &targets, &names)
            .unwrap_err();
        assert!(matches!(err, TrainerError::Training(_)));
    }
}
