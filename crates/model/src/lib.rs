//! Portable trip-cost model types.
//!
//! Everything a consumer needs to reproduce training-time preprocessing
//! and evaluate the exported models lives here:
//! - `table`: raw trip records as a flat row-major table
//! - `encoder` / `scaler` / `pipeline`: fit-once preprocessing state
//! - `forest`: Random Forest evaluation
//! - `mlp`: feed-forward network evaluation (the browser-portable form)
//! - `export`: metadata bundle written next to the exported network
//! - `serialization`: canonical JSON and artifact hashing

pub mod encoder;
pub mod errors;
pub mod export;
pub mod forest;
pub mod mlp;
pub mod pipeline;
pub mod scaler;
pub mod serialization;
pub mod table;

pub use encoder::CategoryEncoder;
pub use errors::ModelError;
pub use export::{EncoderClasses, ExportMetadata};
pub use forest::{ForestModel, Node, Tree};
pub use mlp::{Activation, DenseLayer, MlpNetwork};
pub use pipeline::{FeaturePipeline, CATEGORICAL_COLUMNS, FEATURE_COLUMNS, LABEL_COLUMN};
pub use scaler::StandardScaler;
pub use table::TripTable;

/// Crate version string for metadata and reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
