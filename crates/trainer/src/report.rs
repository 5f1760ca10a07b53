//! Run summary printing and the metrics record uploaded to the store.

use serde::Serialize;
use std::collections::BTreeMap;
use tripcost_model::ForestModel;

use crate::eval::EvaluationReport;

/// Nested training metrics as stored in the `training_metrics` column.
#[derive(Clone, Debug, Serialize)]
pub struct TrainingMetricsDetail {
    pub train_mae: f64,
    pub train_rmse: f64,
    pub train_r2: f64,
    pub train_mape: f64,
    pub test_mae: f64,
    pub test_rmse: f64,
    pub test_r2: f64,
    pub test_mape: f64,
    pub cv_mae: f64,
    pub cv_mae_std: f64,
}

/// One append-only row per training run.
#[derive(Clone, Debug, Serialize)]
pub struct ModelMetricsRecord {
    pub model_version: String,
    pub model_type: String,
    pub n_samples: usize,
    pub n_features: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2_score: f64,
    pub mape: f64,
    pub feature_importance: BTreeMap<String, f64>,
    pub training_metrics: TrainingMetricsDetail,
    /// Always false on insert; promotion happens out-of-band.
    pub is_production: bool,
}

/// Assemble the metrics row for this run.
pub fn build_metrics_record(
    model_version: &str,
    report: &EvaluationReport,
    forest: &ForestModel,
    n_samples: usize,
) -> ModelMetricsRecord {
    let feature_importance: BTreeMap<String, f64> = forest
        .feature_names
        .iter()
        .cloned()
        .zip(forest.feature_importances.iter().copied())
        .collect();

    ModelMetricsRecord {
        model_version: model_version.to_string(),
        model_type: "random_forest".to_string(),
        n_samples,
        n_features: feature_importance.len(),
        mae: report.test.mae,
        rmse: report.test.rmse,
        r2_score: report.test.r2,
        mape: report.test.mape,
        feature_importance,
        training_metrics: TrainingMetricsDetail {
            train_mae: report.train.mae,
            train_rmse: report.train.rmse,
            train_r2: report.train.r2,
            train_mape: report.train.mape,
            test_mae: report.test.mae,
            test_rmse: report.test.rmse,
            test_r2: report.test.r2,
            test_mape: report.test.mape,
            cv_mae: report.cv_mae,
            cv_mae_std: report.cv_mae_std,
        },
        is_production: false,
    }
}

/// Human-readable summary of the run: error statistics and the top-5
/// feature importances.
pub fn print_summary(model_version: &str, report: &EvaluationReport, forest: &ForestModel) {
    println!("\nTraining results ({model_version})");
    println!("  trained on {} samples, tested on {}", report.n_train, report.n_test);
    println!("  test MAE:  {:>14.2}", report.test.mae);
    println!("  test RMSE: {:>14.2}", report.test.rmse);
    println!("  test R²:   {:>14.4}", report.test.r2);
    println!("  test MAPE: {:>13.2}%", report.test.mape);
    println!(
        "  CV MAE:    {:>14.2} ± {:.2}",
        report.cv_mae, report.cv_mae_std
    );

    println!("\nTop 5 feature importances:");
    for (name, importance) in forest.ranked_importances().into_iter().take(5) {
        println!("  {name:<28} {importance:.4}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::RegressionMetrics;
    use tripcost_model::{Node, Tree};

    fn sample_report() -> EvaluationReport {
        let m = RegressionMetrics {
            mae: 1000.0,
            rmse: 1500.0,
            r2: 0.9,
            mape: 8.5,
        };
        EvaluationReport {
            train: m,
            test: m,
            cv_mae: 1100.0,
            cv_mae_std: 120.0,
            n_train: 120,
            n_test: 30,
        }
    }

    fn sample_forest() -> ForestModel {
        ForestModel {
            trees: vec![Tree {
                nodes: vec![Node {
                    feature_index: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                    value: Some(1.0),
                }],
            }],
            feature_names: vec!["distance".into(), "duration".into()],
            feature_importances: vec![0.7, 0.3],
        }
    }

    #[test]
    fn test_metrics_record_fields() {
        let record = build_metrics_record("v1", &sample_report(), &sample_forest(), 150);

        assert_eq!(record.model_type, "random_forest");
        assert_eq!(record.n_samples, 150);
        assert_eq!(record.n_features, 2);
        assert_eq!(record.mae, 1000.0);
        assert!(!record.is_production);
        assert_eq!(record.feature_importance["distance"], 0.7);
        assert_eq!(record.training_metrics.cv_mae, 1100.0);
    }

    #[test]
    fn test_record_serializes_with_nested_maps() {
        let record = build_metrics_record("v1", &sample_report(), &sample_forest(), 150);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["feature_importance"].is_object());
        assert!(value["training_metrics"]["test_rmse"].is_number());
        assert_eq!(value["is_production"], false);
    }
}
