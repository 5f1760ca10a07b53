//! Offline trip-cost trainer.
//!
//! One forward-only batch pipeline: fetch labeled trip records from the
//! remote store, clean and encode them, fit a Random Forest, distill it
//! into a browser-portable network, write the export artifacts, and
//! append a metrics row back to the store.

pub mod cart;
pub mod errors;
pub mod eval;
pub mod export;
pub mod forest;
pub mod outliers;
pub mod report;
pub mod run;
pub mod supabase;

pub use cart::{CartBuilder, TreeConfig};
pub use errors::TrainerError;
pub use eval::{regression_metrics, EvaluationReport, RegressionMetrics};
pub use export::DistillConfig;
pub use forest::{ForestConfig, ForestTrainer};
pub use outliers::remove_outliers;
pub use report::ModelMetricsRecord;
pub use run::{run, train_and_export, RunArtifacts, RunConfig};
pub use supabase::SupabaseClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
