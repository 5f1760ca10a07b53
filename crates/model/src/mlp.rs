//! Feed-forward network evaluation.
//!
//! The browser-portable approximation of the forest: dense layers with
//! ReLU activations and a linear scalar output. Dropout rates are
//! recorded per layer but only apply during training; inference is a
//! plain forward pass.

use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

/// Layer activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Linear => x,
        }
    }
}

/// One dense layer: `weights[out][in]` plus a bias per output unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
    pub activation: Activation,
    /// Dropout rate applied after this layer during training only.
    pub dropout: f64,
}

impl DenseLayer {
    pub fn input_size(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    pub fn output_size(&self) -> usize {
        self.weights.len()
    }

    /// Affine transform followed by the activation.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.input_size() {
            return Err(ModelError::FeatureSizeMismatch {
                expected: self.input_size(),
                actual: input.len(),
            });
        }
        let mut output = Vec::with_capacity(self.output_size());
        for (row, &bias) in self.weights.iter().zip(self.biases.iter()) {
            let mut sum = bias;
            for (&w, &x) in row.iter().zip(input.iter()) {
                sum += w * x;
            }
            output.push(self.activation.apply(sum));
        }
        Ok(output)
    }
}

/// The exported network. Layer sizes and dropout placement follow the
/// distillation architecture: 64/32/16 hidden units, scalar output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpNetwork {
    pub layers: Vec<DenseLayer>,
}

impl MlpNetwork {
    /// Scalar regression output for one feature vector.
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        let mut current = features.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        match current.as_slice() {
            [value] => Ok(*value),
            other => Err(ModelError::FeatureSizeMismatch {
                expected: 1,
                actual: other.len(),
            }),
        }
    }

    /// Width of the input the network was trained for.
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_size)
    }
}
