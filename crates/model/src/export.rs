//! Export metadata bundle.
//!
//! Written next to the exported network so a consuming client can
//! reproduce the exact training-time preprocessing: feature order,
//! scaler parameters, and every encoder's vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pipeline::FeaturePipeline;

/// One encoder's vocabulary as it appears in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderClasses {
    pub classes: Vec<String>,
}

/// Sibling metadata for the exported network artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// Version string derived from the training timestamp
    pub model_version: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    /// Feature column order, identical to training
    pub feature_names: Vec<String>,
    pub scaler_mean: Vec<f64>,
    pub scaler_scale: Vec<f64>,
    pub encoders: BTreeMap<String, EncoderClasses>,
}

impl ExportMetadata {
    /// Capture the fitted pipeline state. Panics never: an unfitted
    /// pipeline simply yields empty scaler vectors, but callers build
    /// this only after a successful fit.
    pub fn from_pipeline(
        pipeline: &FeaturePipeline,
        model_version: String,
        created_at: String,
    ) -> Self {
        let (scaler_mean, scaler_scale) = match pipeline.scaler() {
            Some(s) => (s.mean.clone(), s.scale.clone()),
            None => (Vec::new(), Vec::new()),
        };
        let encoders = pipeline
            .encoders()
            .iter()
            .map(|(name, enc)| {
                (
                    name.clone(),
                    EncoderClasses {
                        classes: enc.classes().to_vec(),
                    },
                )
            })
            .collect();
        Self {
            model_version,
            created_at,
            feature_names: pipeline.feature_names().to_vec(),
            scaler_mean,
            scaler_scale,
            encoders,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TripTable;
    use serde_json::{json, Map, Value};

    #[test]
    fn test_metadata_captures_pipeline_state() {
        let mut row = Map::new();
        row.insert("distance".into(), json!(10.0));
        row.insert("traffic_level".into(), Value::String("low".into()));
        let mut row2 = Map::new();
        row2.insert("distance".into(), json!(20.0));
        row2.insert("traffic_level".into(), Value::String("high".into()));
        let table = TripTable::from_rows(vec![row, row2]).unwrap();

        let mut pipeline = FeaturePipeline::new();
        pipeline.fit_transform(&table).unwrap();

        let meta = ExportMetadata::from_pipeline(
            &pipeline,
            "v20260830_120000".into(),
            "2026-08-30T12:00:00Z".into(),
        );

        assert_eq!(meta.feature_names, pipeline.feature_names());
        assert_eq!(meta.scaler_mean.len(), meta.feature_names.len());
        assert_eq!(meta.scaler_scale.len(), meta.feature_names.len());
        assert_eq!(
            meta.encoders["traffic_level"].classes,
            vec!["high", "low", "unknown"]
        );
    }
}
