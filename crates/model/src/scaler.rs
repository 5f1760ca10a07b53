//! Per-feature standardization.
//!
//! Mean/scale pairs fitted once on the training matrix and reapplied
//! unchanged at inference. A zero-variance column gets scale 1.0 so
//! transforming never divides by zero.

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

/// Fitted standardization parameters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit mean and population standard deviation per column.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        let mut scale = vec![0.0; width];

        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                mean[i] += v;
            }
        }
        for m in &mut mean {
            *m /= n.max(1.0);
        }

        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                let d = v - mean[i];
                scale[i] += d * d;
            }
        }
        for s in &mut scale {
            *s = (*s / n.max(1.0)).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    /// Standardize rows in place.
    pub fn transform(&self, rows: &mut [Vec<f64>]) -> Result<()> {
        for row in rows.iter_mut() {
            if row.len() != self.mean.len() {
                return Err(ModelError::FeatureSizeMismatch {
                    expected: self.mean.len(),
                    actual: row.len(),
                });
            }
            for (i, v) in row.iter_mut().enumerate() {
                *v = (*v - self.mean[i]) / self.scale[i];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows);
        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]); // zero variance clamps to 1.0

        let mut out = rows.clone();
        scaler.transform(&mut out).unwrap();
        assert_eq!(out, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_transform_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]]);
        let mut rows = vec![vec![1.0]];
        let err = scaler.transform(&mut rows).unwrap_err();
        assert!(matches!(err, ModelError::FeatureSizeMismatch { expected: 2, actual: 1 }));
    }
}
