//! Hold-out and cross-validated evaluation.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use tracing::warn;

use crate::errors::{Result, TrainerError};
use crate::forest::{ForestConfig, ForestTrainer};
use tripcost_model::ForestModel;

/// Error statistics for one partition.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Percent error over nonzero labels only; zero labels are skipped
    /// and logged (the percentage is undefined at zero).
    pub mape: f64,
}

/// Full evaluation of one training run.
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
    pub cv_mae: f64,
    pub cv_mae_std: f64,
    pub n_train: usize,
    pub n_test: usize,
}

/// Seeded shuffle split into (train, test) index sets.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).round() as usize;
    let n_test = n_test.clamp(1, n.saturating_sub(1).max(1));
    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    (train, test)
}

/// MAE, RMSE, R², and guarded MAPE for a prediction vector.
pub fn regression_metrics(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
    let n = y_true.len() as f64;
    let mae = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    let mut zero_labels = 0usize;
    let mut pct_sum = 0.0;
    let mut pct_count = 0usize;
    for (t, p) in y_true.iter().zip(y_pred) {
        if *t == 0.0 {
            zero_labels += 1;
            continue;
        }
        pct_sum += ((t - p) / t).abs();
        pct_count += 1;
    }
    if zero_labels > 0 {
        warn!(
            zero_labels,
            "labels with value zero skipped in MAPE (undefined percentage error)"
        );
    }
    let mape = if pct_count > 0 {
        pct_sum / pct_count as f64 * 100.0
    } else {
        0.0
    };

    RegressionMetrics { mae, rmse, r2, mape }
}

/// Evaluate a fitted model on a subset of rows.
pub fn evaluate_subset(
    model: &ForestModel,
    features: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
) -> Result<RegressionMetrics> {
    let rows: Vec<Vec<f64>> = indices.iter().map(|&i| features[i].clone()).collect();
    let y_true: Vec<f64> = indices.iter().map(|&i| targets[i]).collect();
    let y_pred = model.predict_batch(&rows)?;
    Ok(regression_metrics(&y_true, &y_pred))
}

/// K-fold cross-validated MAE over the full matrix, reported as
/// (mean, standard deviation). Folds are contiguous slices of a seeded
/// shuffle, each scored by a forest fitted on the remaining rows.
pub fn cross_validate_mae(
    config: &ForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
    folds: usize,
) -> Result<(f64, f64)> {
    let n = features.len();
    if folds < 2 || n < folds {
        return Err(TrainerError::Training(format!(
            "cannot run {folds}-fold cross-validation on {n} samples"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let mut scores = Vec::with_capacity(folds);
    for fold in 0..folds {
        let start = fold * n / folds;
        let end = (fold + 1) * n / folds;
        let held_out = &indices[start..end];

        let train_rows: Vec<Vec<f64>> = indices[..start]
            .iter()
            .chain(indices[end..].iter())
            .map(|&i| features[i].clone())
            .collect();
        let train_targets: Vec<f64> = indices[..start]
            .iter()
            .chain(indices[end..].iter())
            .map(|&i| targets[i])
            .collect();

        let model =
            ForestTrainer::new(config.clone()).train(&train_rows, &train_targets, feature_names)?;
        let metrics = evaluate_subset(&model, features, targets, held_out)?;
        scores.push(metrics.mae);
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    Ok((mean, var.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(100, 0.2, 42);
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);
        for t in &test {
            assert!(!train.contains(t));
        }
    }

    #[test]
    fn test_split_deterministic() {
        assert_eq!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 7));
        assert_ne!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 8));
    }

    #[test]
    fn test_perfect_prediction_metrics() {
        let y = vec![10.0, 20.0, 30.0];
        let m = regression_metrics(&y, &y);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.mape, 0.0);
    }

    #[test]
    fn test_known_errors() {
        let y_true = vec![10.0, 20.0];
        let y_pred = vec![12.0, 16.0];
        let m = regression_metrics(&y_true, &y_pred);
        assert!((m.mae - 3.0).abs() < 1e-12);
        assert!((m.rmse - (10.0f64).sqrt()).abs() < 1e-12);
        // MAPE = (0.2 + 0.2) / 2 * 100
        assert!((m.mape - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_mape_guarded_against_zero_labels() {
        let y_true = vec![0.0, 10.0];
        let y_pred = vec![5.0, 11.0];
        let m = regression_metrics(&y_true, &y_pred);
        assert!(m.mape.is_finite());
        assert!((m.mape - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_labels_mape_is_zero() {
        let m = regression_metrics(&[0.0, 0.0], &[1.0, 2.0]);
        assert_eq!(m.mape, 0.0);
    }

    #[test]
    fn test_cross_validation_runs() {
        let features: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..50).map(|i| 2.0 * i as f64).collect();
        let names = vec!["distance".to_string()];
        let config = ForestConfig {
            n_trees: 5,
            max_depth: 4,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        };
        let (mean, std) = cross_validate_mae(&config, &features, &targets, &names, 5).unwrap();
        assert!(mean >= 0.0);
        assert!(std >= 0.0);
    }

    #[test]
    fn test_cross_validation_rejects_tiny_dataset() {
        let features = vec![vec![1.0], vec![2.0]];
        let targets = vec![1.0, 2.0];
        let names = vec!["distance".to_string()];
        assert!(
            cross_validate_mae(&ForestConfig::default(), &features, &targets, &names, 5).is_err()
        );
    }
}
