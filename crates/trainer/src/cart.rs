//! CART regression tree builder.
//!
//! Exact-greedy variance-reduction splits over midpoint thresholds.
//! Candidate thresholds are enumerated in fixed feature-then-value
//! order and ties keep the first candidate found, so tree construction
//! is fully deterministic for a given sample set.

use tripcost_model::{Node, Tree};

/// Parameters for a single tree.
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Builds one regression tree over a set of row indices (typically a
/// bootstrap resample) and accumulates per-feature impurity decrease.
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    targets: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<f64>], targets: &'a [f64], config: TreeConfig) -> Self {
        assert_eq!(features.len(), targets.len());
        let feature_count = features.first().map_or(0, Vec::len);
        Self {
            config,
            features,
            targets,
            feature_count,
        }
    }

    /// Build a tree from the given row indices. Returns the tree and
    /// the summed impurity decrease per feature (unnormalized).
    pub fn build(&self, indices: &[usize]) -> (Tree, Vec<f64>) {
        let mut nodes = Vec::new();
        let mut importances = vec![0.0; self.feature_count];
        self.build_node(indices, 0, &mut nodes, &mut importances);
        (Tree { nodes }, importances)
    }

    fn build_node(
        &self,
        indices: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        importances: &mut [f64],
    ) -> u32 {
        let current_idx = nodes.len() as u32;
        let leaf_value = self.mean_target(indices);

        if depth >= self.config.max_depth || indices.len() < self.config.min_samples_split {
            nodes.push(Self::leaf(leaf_value));
            return current_idx;
        }

        let Some(split) = self.find_best_split(indices) else {
            nodes.push(Self::leaf(leaf_value));
            return current_idx;
        };

        let (left_indices, right_indices) =
            self.partition(indices, split.feature_idx, split.threshold);
        if left_indices.len() < self.config.min_samples_leaf
            || right_indices.len() < self.config.min_samples_leaf
        {
            nodes.push(Self::leaf(leaf_value));
            return current_idx;
        }

        importances[split.feature_idx] += split.gain;

        nodes.push(Node {
            feature_index: split.feature_idx as u16,
            threshold: split.threshold,
            left: 0,
            right: 0,
            value: None,
        });

        let left = self.build_node(&left_indices, depth + 1, nodes, importances);
        let right = self.build_node(&right_indices, depth + 1, nodes, importances);
        nodes[current_idx as usize].left = left;
        nodes[current_idx as usize].right = right;

        current_idx
    }

    fn leaf(value: f64) -> Node {
        Node {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    /// Exact-greedy search: for every feature, sweep the sorted sample
    /// values and score each midpoint between distinct neighbors by the
    /// reduction in summed squared error.
    fn find_best_split(&self, indices: &[usize]) -> Option<BestSplit> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_sse = total_sq - total_sum.powi(2) / n as f64;

        let mut best: Option<BestSplit> = None;

        for feature_idx in 0..self.feature_count {
            let mut ordered: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.features[i][feature_idx], self.targets[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 1..n {
                let (prev_value, prev_target) = ordered[i - 1];
                left_sum += prev_target;
                left_sq += prev_target.powi(2);

                let value = ordered[i].0;
                if value <= prev_value {
                    continue;
                }
                let left_n = i;
                let right_n = n - i;
                if left_n < self.config.min_samples_leaf
                    || right_n < self.config.min_samples_leaf
                {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum.powi(2) / left_n as f64;
                let right_sse = right_sq - right_sum.powi(2) / right_n as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: (prev_value + value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn partition(
        &self,
        indices: &[usize],
        feature_idx: usize,
        threshold: f64,
    ) -> (Vec<usize>, Vec<usize>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        for &idx in indices {
            if self.features[idx][feature_idx] <= threshold {
                left.push(idx);
            } else {
                right.push(idx);
            }
        }
        (left, right)
    }

    fn mean_target(&self, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        indices.iter().map(|&i| self.targets[i]).sum::<f64>() / indices.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i < 5 { 10.0 } else { 50.0 }).collect();
        (features, targets)
    }

    #[test]
    fn test_finds_step_split() {
        let (features, targets) = step_data();
        let config = TreeConfig {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        };
        let builder = CartBuilder::new(&features, &targets, config);
        let indices: Vec<usize> = (0..10).collect();
        let (tree, importances) = builder.build(&indices);

        assert_eq!(tree.predict(&[2.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[7.0, 0.0]), 50.0);
        // All the signal is in feature 0
        assert!(importances[0] > 0.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_min_samples_split_yields_leaf() {
        let (features, targets) = step_data();
        let config = TreeConfig {
            max_depth: 3,
            min_samples_split: 100,
            min_samples_leaf: 1,
        };
        let builder = CartBuilder::new(&features, &targets, config);
        let indices: Vec<usize> = (0..10).collect();
        let (tree, _) = builder.build(&indices);

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].value, Some(30.0));
    }

    #[test]
    fn test_constant_targets_yield_leaf() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets = vec![7.0; 10];
        let builder = CartBuilder::new(&features, &targets, TreeConfig::default());
        let indices: Vec<usize> = (0..10).collect();
        let (tree, _) = builder.build(&indices);

        // No split has positive gain on constant targets
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].value, Some(7.0));
    }

    #[test]
    fn test_deterministic_construction() {
        let (features, targets) = step_data();
        let indices: Vec<usize> = (0..10).collect();
        let builder = CartBuilder::new(&features, &targets, TreeConfig::default());
        let (tree1, imp1) = builder.build(&indices);
        let (tree2, imp2) = builder.build(&indices);
        assert_eq!(tree1, tree2);
        assert_eq!(imp1, imp2);
    }
}
