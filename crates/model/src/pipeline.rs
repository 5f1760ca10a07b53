//! Feature preparation pipeline.
//!
//! Two modes, mirroring the fit-once/reuse-forever contract:
//! - `fit_transform` builds the category encoders and the scaler from
//!   the training table and records the feature column order;
//! - `transform` reapplies the remembered state to new rows. Unseen
//!   category values bucket to `"unknown"` rather than erroring, so
//!   inference can never fail on vocabulary drift.
//!
//! The output column order equals `feature_names()` and is stable for
//! the lifetime of the fitted pipeline; the exported metadata carries
//! it so clients reproduce the exact layout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::encoder::{CategoryEncoder, UNKNOWN_LABEL};
use crate::errors::{ModelError, Result};
use crate::scaler::StandardScaler;
use crate::table::TripTable;

/// Recognized feature columns, in the fixed output order.
pub const FEATURE_COLUMNS: [&str; 14] = [
    "distance",
    "duration",
    "optimization_mode",
    "hour_of_day",
    "day_of_week",
    "is_weekend",
    "is_holiday",
    "traffic_level",
    "estimated_traffic_delay",
    "fuel_price",
    "toll_roads_used",
    "weather_condition",
    "temperature",
    "data_source",
];

/// Columns that get a category encoder.
pub const CATEGORICAL_COLUMNS: [&str; 4] = [
    "optimization_mode",
    "traffic_level",
    "weather_condition",
    "data_source",
];

/// Label column name.
pub const LABEL_COLUMN: &str = "actual_cost";

/// Named imputation defaults for numeric columns. The temperature
/// default is the mean for the service region.
const NUMERIC_DEFAULTS: [(&str, f64); 3] = [
    ("estimated_traffic_delay", 0.0),
    ("temperature", 28.0),
    ("toll_roads_used", 1.0),
];

/// Fit-once preprocessing state: encoders, scaler, and column order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeaturePipeline {
    encoders: BTreeMap<String, CategoryEncoder>,
    scaler: Option<StandardScaler>,
    feature_names: Vec<String>,
}

impl FeaturePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column order of the produced matrix; empty before fitting.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn encoders(&self) -> &BTreeMap<String, CategoryEncoder> {
        &self.encoders
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// Fit encoders and scaler on the training table and return the
    /// standardized feature matrix. Row count is preserved; column
    /// count equals the number of recognized columns present.
    pub fn fit_transform(&mut self, table: &TripTable) -> Result<Vec<Vec<f64>>> {
        self.encoders.clear();
        for &column in CATEGORICAL_COLUMNS.iter() {
            if !table.has_column(column) {
                continue;
            }
            let values = (0..table.len())
                .map(|row| {
                    table
                        .categorical(row, column)
                        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
                })
                .collect::<Vec<_>>();
            self.encoders
                .insert(column.to_string(), CategoryEncoder::fit(values));
        }

        self.feature_names = FEATURE_COLUMNS
            .iter()
            .filter(|&&c| table.has_column(c))
            .map(|&c| c.to_string())
            .collect();
        if self.feature_names.is_empty() {
            return Err(ModelError::NoFeatureColumns);
        }

        let mut matrix = self.encode_rows(table)?;
        let scaler = StandardScaler::fit(&matrix);
        scaler.transform(&mut matrix)?;
        self.scaler = Some(scaler);
        Ok(matrix)
    }

    /// Transform-only mode: reapply the fitted state to new rows.
    pub fn transform(&self, table: &TripTable) -> Result<Vec<Vec<f64>>> {
        let scaler = self.scaler.as_ref().ok_or(ModelError::NotFitted)?;
        let mut matrix = self.encode_rows(table)?;
        scaler.transform(&mut matrix)?;
        Ok(matrix)
    }

    /// Encode one table into an unscaled numeric matrix using the
    /// current encoders and the recorded column order.
    fn encode_rows(&self, table: &TripTable) -> Result<Vec<Vec<f64>>> {
        if self.feature_names.is_empty() {
            return Err(ModelError::NotFitted);
        }

        let mut matrix = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let mut encoded = Vec::with_capacity(self.feature_names.len());
            for name in &self.feature_names {
                let value = if let Some(encoder) = self.encoders.get(name) {
                    let label = table
                        .categorical(row, name)
                        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());
                    encoder.encode(&label) as f64
                } else {
                    self.numeric_or_default(table, row, name)
                };
                encoded.push(value);
            }
            matrix.push(encoded);
        }
        Ok(matrix)
    }

    fn numeric_or_default(&self, table: &TripTable, row: usize, column: &str) -> f64 {
        if let Some(v) = table.numeric(row, column) {
            return v;
        }
        for (name, default) in NUMERIC_DEFAULTS {
            if name == column {
                return default;
            }
        }
        debug!(column, row, "missing numeric value without named default, using 0");
        0.0
    }
}
