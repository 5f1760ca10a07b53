//! The one-shot pipeline: Fetch → Prepare → Train → Export → Report.
//!
//! Strictly forward, no retries, no checkpointing. A failure anywhere
//! aborts the run; an abort after export but before the metrics insert
//! leaves artifacts on disk with no database row, which is accepted.

use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

use crate::errors::Result;
use crate::eval::{
    cross_validate_mae, evaluate_subset, train_test_split, EvaluationReport,
};
use crate::export::{distill_forest, write_artifacts, DistillConfig};
use crate::forest::{ForestConfig, ForestTrainer};
use crate::outliers::{remove_outliers, DEFAULT_Z_THRESHOLD};
use crate::report::{build_metrics_record, print_summary};
use crate::supabase::SupabaseClient;
use tripcost_model::{
    ExportMetadata, FeaturePipeline, ForestModel, TripTable, LABEL_COLUMN,
};

/// Cross-validation fold count.
const CV_FOLDS: usize = 5;
/// Held-out fraction of the 80/20 split.
const TEST_FRACTION: f64 = 0.2;

/// Run parameters collected from the CLI.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub min_samples: usize,
    pub output_dir: PathBuf,
    pub trees: usize,
    pub max_depth: usize,
    pub seed: u64,
    pub distill: DistillConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_samples: 100,
            output_dir: PathBuf::from("models/tripcost"),
            trees: 100,
            max_depth: 10,
            seed: 42,
            distill: DistillConfig::default(),
        }
    }
}

/// Everything a completed run produced, for reporting and testing.
pub struct RunArtifacts {
    pub model_version: String,
    pub report: EvaluationReport,
    pub forest: ForestModel,
    pub pipeline: FeaturePipeline,
    pub n_samples: usize,
}

/// Full pipeline against the remote store.
pub fn run(client: &SupabaseClient, config: &RunConfig) -> Result<()> {
    let table = client.fetch_training_rows(config.min_samples)?;

    let before = table.len();
    let table = remove_outliers(table, DEFAULT_Z_THRESHOLD);
    info!(
        before,
        after = table.len(),
        "outlier removal finished"
    );

    let artifacts = train_and_export(&table, config)?;
    print_summary(&artifacts.model_version, &artifacts.report, &artifacts.forest);

    let record = build_metrics_record(
        &artifacts.model_version,
        &artifacts.report,
        &artifacts.forest,
        artifacts.n_samples,
    );
    client.insert_model_metrics(&record)?;

    info!(
        model_version = artifacts.model_version.as_str(),
        "training complete"
    );
    Ok(())
}

/// Prepare → Train → Export on an already-fetched, already-filtered
/// table. Split out so the pipeline is exercisable without the store.
pub fn train_and_export(table: &TripTable, config: &RunConfig) -> Result<RunArtifacts> {
    let model_version = format!("v{}", Utc::now().format("%Y%m%d_%H%M%S"));
    let created_at = Utc::now().to_rfc3339();

    let mut pipeline = FeaturePipeline::new();
    let features = pipeline.fit_transform(table)?;
    let targets = table.label_vector(LABEL_COLUMN)?;
    let feature_names = pipeline.feature_names().to_vec();
    info!(
        samples = features.len(),
        features = feature_names.len(),
        "feature matrix prepared"
    );

    let forest_config = ForestConfig {
        n_trees: config.trees,
        max_depth: config.max_depth,
        seed: config.seed,
        ..ForestConfig::default()
    };

    let (train_idx, test_idx) = train_test_split(features.len(), TEST_FRACTION, config.seed);
    info!(
        train = train_idx.len(),
        test = test_idx.len(),
        "training Random Forest"
    );

    let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| features[i].clone()).collect();
    let train_targets: Vec<f64> = train_idx.iter().map(|&i| targets[i]).collect();
    let forest =
        ForestTrainer::new(forest_config.clone()).train(&train_rows, &train_targets, &feature_names)?;

    let train_metrics = evaluate_subset(&forest, &features, &targets, &train_idx)?;
    let test_metrics = evaluate_subset(&forest, &features, &targets, &test_idx)?;
    let (cv_mae, cv_mae_std) =
        cross_validate_mae(&forest_config, &features, &targets, &feature_names, CV_FOLDS)?;

    let report = EvaluationReport {
        train: train_metrics,
        test: test_metrics,
        cv_mae,
        cv_mae_std,
        n_train: train_idx.len(),
        n_test: test_idx.len(),
    };

    info!("distilling forest into the exportable network");
    let mut distill_config = config.distill.clone();
    distill_config.seed = config.seed;
    let network = distill_forest(&forest, &distill_config)?;

    let metadata = ExportMetadata::from_pipeline(&pipeline, model_version.clone(), created_at);
    write_artifacts(&config.output_dir, &network, &metadata)?;

    Ok(RunArtifacts {
        model_version,
        report,
        forest,
        pipeline,
        n_samples: table.len(),
    })
}
