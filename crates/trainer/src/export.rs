//! Forest distillation and artifact export.
//!
//! The Random Forest has no browser-portable serialization, so the
//! export step trains a small feed-forward network to reproduce the
//! forest's predictions and writes that network plus the preprocessing
//! metadata to disk. The synthetic training inputs are drawn from a
//! standard normal distribution, not from the empirical post-scaling
//! feature distribution; that is the documented (approximate)
//! technique, preserved as-is.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{Result, TrainerError};
use tripcost_model::serialization::{artifact_hash, canonical_json_string};
use tripcost_model::{Activation, DenseLayer, ExportMetadata, ForestModel, MlpNetwork};

/// File names inside the output directory.
pub const MODEL_FILE: &str = "model.json";
pub const HASH_FILE: &str = "model.hash";
pub const METADATA_FILE: &str = "metadata.json";

/// Distillation hyperparameters.
#[derive(Clone, Debug)]
pub struct DistillConfig {
    pub synthetic_samples: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub hidden: [usize; 3],
    pub dropout: f64,
    pub seed: u64,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            synthetic_samples: 10_000,
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_split: 0.2,
            hidden: [64, 32, 16],
            dropout: 0.2,
            seed: 42,
        }
    }
}

/// Train a network that imitates the forest on synthetic inputs.
pub fn distill_forest(forest: &ForestModel, config: &DistillConfig) -> Result<MlpNetwork> {
    let n_features = forest.feature_names.len();
    if n_features == 0 {
        return Err(TrainerError::Training(
            "cannot distill a forest with no features".into(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(config.seed);

    info!(
        samples = config.synthetic_samples,
        features = n_features,
        "drawing synthetic standard-normal inputs for distillation"
    );
    let inputs: Vec<Vec<f64>> = (0..config.synthetic_samples)
        .map(|_| (0..n_features).map(|_| standard_normal(&mut rng)).collect())
        .collect();
    let targets = forest.predict_batch(&inputs)?;

    let mut trainer = MlpTrainer::new(n_features, config, &mut rng);
    trainer.fit(&inputs, &targets, config, &mut rng)?;
    Ok(trainer.into_network())
}

/// Write the exported network, its hash, and the metadata bundle.
pub fn write_artifacts(
    output_dir: &Path,
    network: &MlpNetwork,
    metadata: &ExportMetadata,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let model_json = canonical_json_string(network)?;
    let model_path = output_dir.join(MODEL_FILE);
    std::fs::write(&model_path, &model_json)?;

    let hash = artifact_hash(model_json.as_bytes());
    std::fs::write(output_dir.join(HASH_FILE), &hash)?;

    let metadata_json = canonical_json_string(metadata)?;
    std::fs::write(output_dir.join(METADATA_FILE), &metadata_json)?;

    info!(
        model = %model_path.display(),
        hash = hash.as_str(),
        "export artifacts written"
    );
    Ok(())
}

/// Box–Muller transform over the uniform generator; good enough for
/// synthetic sampling and weight initialization, and keeps the run
/// reproducible from the single seed.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

struct TrainLayer {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    activation: Activation,
    dropout: f64,
    // Adam first/second moments, same shapes as the parameters
    mw: Vec<Vec<f64>>,
    vw: Vec<Vec<f64>>,
    mb: Vec<f64>,
    vb: Vec<f64>,
}

impl TrainLayer {
    fn new(
        input: usize,
        output: usize,
        activation: Activation,
        dropout: f64,
        rng: &mut StdRng,
    ) -> Self {
        // Glorot-uniform initialization
        let limit = (6.0 / (input + output) as f64).sqrt();
        let weights: Vec<Vec<f64>> = (0..output)
            .map(|_| (0..input).map(|_| rng.gen_range(-limit..limit)).collect())
            .collect();
        Self {
            weights,
            biases: vec![0.0; output],
            activation,
            dropout,
            mw: vec![vec![0.0; input]; output],
            vw: vec![vec![0.0; input]; output],
            mb: vec![0.0; output],
            vb: vec![0.0; output],
        }
    }
}

/// Per-layer forward cache for one sample.
struct LayerCache {
    input: Vec<f64>,
    pre_activation: Vec<f64>,
    /// Inverted-dropout scale per unit (1/keep or 0), all-ones in eval
    mask: Vec<f64>,
}

struct MlpTrainer {
    layers: Vec<TrainLayer>,
    step: u64,
}

impl MlpTrainer {
    fn new(n_features: usize, config: &DistillConfig, rng: &mut StdRng) -> Self {
        let [h1, h2, h3] = config.hidden;
        let layers = vec![
            TrainLayer::new(n_features, h1, Activation::Relu, config.dropout, rng),
            TrainLayer::new(h1, h2, Activation::Relu, config.dropout, rng),
            TrainLayer::new(h2, h3, Activation::Relu, 0.0, rng),
            TrainLayer::new(h3, 1, Activation::Linear, 0.0, rng),
        ];
        Self { layers, step: 0 }
    }

    fn fit(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[f64],
        config: &DistillConfig,
        rng: &mut StdRng,
    ) -> Result<()> {
        let n = inputs.len();
        let n_val = ((n as f64) * config.validation_split).round() as usize;
        let n_train = n - n_val;
        if n_train == 0 {
            return Err(TrainerError::Training(
                "no training samples left after validation split".into(),
            ));
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let (train_idx, val_idx) = order.split_at(n_train);
        let mut train_idx = train_idx.to_vec();

        for epoch in 0..config.epochs {
            train_idx.shuffle(rng);
            let mut epoch_loss = 0.0;
            for batch in train_idx.chunks(config.batch_size) {
                epoch_loss += self.train_batch(inputs, targets, batch, config, rng);
            }
            let train_loss = epoch_loss / train_idx.len() as f64;
            let val_loss = self.validation_loss(inputs, targets, val_idx);
            debug!(epoch, train_loss, val_loss, "distillation epoch");
        }

        let final_val = self.validation_loss(inputs, targets, val_idx);
        info!(
            epochs = config.epochs,
            val_mse = final_val,
            "distillation finished"
        );
        Ok(())
    }

    /// One minibatch of forward/backward plus an Adam step. Returns the
    /// summed squared error over the batch.
    fn train_batch(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[f64],
        batch: &[usize],
        config: &DistillConfig,
        rng: &mut StdRng,
    ) -> f64 {
        let mut grad_w: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|l| vec![vec![0.0; l.weights[0].len()]; l.weights.len()])
            .collect();
        let mut grad_b: Vec<Vec<f64>> = self
            .layers
            .iter()
            .map(|l| vec![0.0; l.biases.len()])
            .collect();

        let batch_len = batch.len() as f64;
        let mut batch_loss = 0.0;

        for &sample in batch {
            let (caches, prediction) = self.forward_train(&inputs[sample], rng);
            let error = prediction - targets[sample];
            batch_loss += error * error;

            // dL/d(output activation); MSE averaged over the batch
            let mut upstream = vec![2.0 * error / batch_len];

            for (layer_idx, layer) in self.layers.iter().enumerate().rev() {
                let cache = &caches[layer_idx];
                let mut dz = vec![0.0; layer.biases.len()];
                for (unit, d) in upstream.iter().enumerate() {
                    let slope = match layer.activation {
                        Activation::Relu => {
                            if cache.pre_activation[unit] > 0.0 {
                                1.0
                            } else {
                                0.0
                            }
                        }
                        Activation::Linear => 1.0,
                    };
                    dz[unit] = d * cache.mask[unit] * slope;
                }

                for (unit, &dzu) in dz.iter().enumerate() {
                    grad_b[layer_idx][unit] += dzu;
                    for (j, &x) in cache.input.iter().enumerate() {
                        grad_w[layer_idx][unit][j] += dzu * x;
                    }
                }

                if layer_idx > 0 {
                    let mut next = vec![0.0; cache.input.len()];
                    for (unit, &dzu) in dz.iter().enumerate() {
                        for (j, &w) in layer.weights[unit].iter().enumerate() {
                            next[j] += dzu * w;
                        }
                    }
                    upstream = next;
                }
            }
        }

        self.adam_step(&grad_w, &grad_b, config.learning_rate);
        batch_loss
    }

    /// Forward pass with inverted dropout, caching what backprop needs.
    fn forward_train(&self, input: &[f64], rng: &mut StdRng) -> (Vec<LayerCache>, f64) {
        let mut caches = Vec::with_capacity(self.layers.len());
        let mut current = input.to_vec();

        for layer in &self.layers {
            let layer_input = current.clone();
            let mut pre = Vec::with_capacity(layer.biases.len());
            for (row, &bias) in layer.weights.iter().zip(&layer.biases) {
                let mut sum = bias;
                for (&w, &x) in row.iter().zip(&current) {
                    sum += w * x;
                }
                pre.push(sum);
            }

            let keep = 1.0 - layer.dropout;
            let mask: Vec<f64> = pre
                .iter()
                .map(|_| {
                    if layer.dropout > 0.0 && rng.gen_range(0.0..1.0) < layer.dropout {
                        0.0
                    } else if layer.dropout > 0.0 {
                        1.0 / keep
                    } else {
                        1.0
                    }
                })
                .collect();

            current = pre
                .iter()
                .zip(&mask)
                .map(|(&z, &m)| layer.activation.apply(z) * m)
                .collect();
            caches.push(LayerCache {
                input: layer_input,
                pre_activation: pre,
                mask,
            });
        }

        let prediction = current[0];
        (caches, prediction)
    }

    /// Plain forward pass (dropout disabled) for validation scoring.
    fn forward_eval(&self, input: &[f64]) -> f64 {
        let mut current = input.to_vec();
        for layer in &self.layers {
            let mut next = Vec::with_capacity(layer.biases.len());
            for (row, &bias) in layer.weights.iter().zip(&layer.biases) {
                let mut sum = bias;
                for (&w, &x) in row.iter().zip(&current) {
                    sum += w * x;
                }
                next.push(layer.activation.apply(sum));
            }
            current = next;
        }
        current[0]
    }

    fn validation_loss(&self, inputs: &[Vec<f64>], targets: &[f64], val_idx: &[usize]) -> f64 {
        if val_idx.is_empty() {
            return 0.0;
        }
        let sum: f64 = val_idx
            .iter()
            .map(|&i| {
                let e = self.forward_eval(&inputs[i]) - targets[i];
                e * e
            })
            .sum();
        sum / val_idx.len() as f64
    }

    fn adam_step(&mut self, grad_w: &[Vec<Vec<f64>>], grad_b: &[Vec<f64>], lr: f64) {
        self.step += 1;
        let t = self.step as i32;
        let lr_t = lr * (1.0 - BETA2.powi(t)).sqrt() / (1.0 - BETA1.powi(t));

        for (layer, (gw, gb)) in self.layers.iter_mut().zip(grad_w.iter().zip(grad_b)) {
            for (unit, grow) in gw.iter().enumerate() {
                for (j, &g) in grow.iter().enumerate() {
                    let m = &mut layer.mw[unit][j];
                    let v = &mut layer.vw[unit][j];
                    *m = BETA1 * *m + (1.0 - BETA1) * g;
                    *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                    layer.weights[unit][j] -= lr_t * *m / (v.sqrt() + ADAM_EPS);
                }
            }
            for (unit, &g) in gb.iter().enumerate() {
                let m = &mut layer.mb[unit];
                let v = &mut layer.vb[unit];
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                layer.biases[unit] -= lr_t * *m / (v.sqrt() + ADAM_EPS);
            }
        }
    }

    fn into_network(self) -> MlpNetwork {
        MlpNetwork {
            layers: self
                .layers
                .into_iter()
                .map(|l| DenseLayer {
                    weights: l.weights,
                    biases: l.biases,
                    activation: l.activation,
                    dropout: l.dropout,
                })
                .collect(),
        }
    }
}
