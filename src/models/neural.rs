//! Feed-forward network on standardized features.
//!
//! Dense 64-64-32-1 architecture with rectified-linear hidden units, mean
//! squared error loss and an Adam optimizer. Inputs are standardized with
//! statistics fit on the training partition only. The trailing 20% of the
//! training rows serve as an internal validation split; per-epoch train and
//! validation losses feed the training-history chart.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use super::{DemandModel, FitReport, LossHistory, ModelKind};
use crate::data::FeatureTable;

#[derive(Debug, Clone)]
pub struct NeuralConfig {
    pub hidden_units: [usize; 3],
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            hidden_units: [64, 64, 32],
            epochs: 100,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_split: 0.2,
            seed: 42,
        }
    }
}

/// Z-score standardization with statistics from the training partition.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for (s, (v, m)) in stds.iter_mut().zip(row.iter().zip(means.iter())) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
        }

        Self { means, stds }
    }

    /// A zero-variance feature maps to 0.0 rather than dividing by zero.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(self.stds.iter()))
                    .map(|(v, (mean, std))| {
                        if *std < 1e-10 {
                            0.0
                        } else {
                            (v - mean) / std
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}

struct Layer {
    /// Row-major: `weights[out][in]`.
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl Layer {
    fn init(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        // He initialization for rectified-linear units.
        let dist = Normal::new(0.0, (2.0 / inputs as f64).sqrt()).expect("valid std");
        let weights = (0..outputs)
            .map(|_| (0..inputs).map(|_| dist.sample(rng)).collect())
            .collect();
        Self {
            weights,
            biases: vec![0.0; outputs],
        }
    }
}

/// Per-layer Adam moment buffers.
struct AdamState {
    m_weights: Vec<Vec<Vec<f64>>>,
    v_weights: Vec<Vec<Vec<f64>>>,
    m_biases: Vec<Vec<f64>>,
    v_biases: Vec<Vec<f64>>,
    step: u64,
}

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-8;

impl AdamState {
    fn for_layers(layers: &[Layer]) -> Self {
        Self {
            m_weights: layers
                .iter()
                .map(|l| l.weights.iter().map(|row| vec![0.0; row.len()]).collect())
                .collect(),
            v_weights: layers
                .iter()
                .map(|l| l.weights.iter().map(|row| vec![0.0; row.len()]).collect())
                .collect(),
            m_biases: layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
            v_biases: layers.iter().map(|l| vec![0.0; l.biases.len()]).collect(),
            step: 0,
        }
    }
}

pub struct NeuralModel {
    config: NeuralConfig,
    scaler: Option<StandardScaler>,
    layers: Vec<Layer>,
}

impl NeuralModel {
    pub fn new(config: NeuralConfig) -> Self {
        Self {
            config,
            scaler: None,
            layers: Vec::new(),
        }
    }

    fn layer_sizes(&self, n_inputs: usize) -> Vec<usize> {
        let mut sizes = vec![n_inputs];
        sizes.extend_from_slice(&self.config.hidden_units);
        sizes.push(1);
        sizes
    }

    /// Forward pass keeping the activation of every layer.
    /// `activations[0]` is the input row; the last entry has length 1.
    fn forward(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = vec![input.to_vec()];
        let last = self.layers.len() - 1;

        for (index, layer) in self.layers.iter().enumerate() {
            let previous = activations.last().expect("non-empty activations");
            let mut out = Vec::with_capacity(layer.biases.len());
            for (weights, bias) in layer.weights.iter().zip(layer.biases.iter()) {
                let mut z = *bias;
                for (w, a) in weights.iter().zip(previous.iter()) {
                    z += w * a;
                }
                // Hidden layers are rectified-linear; the output is linear.
                out.push(if index < last { z.max(0.0) } else { z });
            }
            activations.push(out);
        }

        activations
    }

    fn predict_row(&self, input: &[f64]) -> f64 {
        self.forward(input).last().expect("output layer")[0]
    }

    fn mse(&self, rows: &[Vec<f64>], targets: &[f64]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let sum: f64 = rows
            .iter()
            .zip(targets.iter())
            .map(|(row, y)| (self.predict_row(row) - y).powi(2))
            .sum();
        sum / rows.len() as f64
    }

    /// One gradient step over a mini-batch. Returns the batch loss before
    /// the update.
    fn train_batch(
        &mut self,
        rows: &[&Vec<f64>],
        targets: &[f64],
        adam: &mut AdamState,
    ) -> f64 {
        let batch = rows.len() as f64;
        let last = self.layers.len() - 1;

        let mut grad_weights: Vec<Vec<Vec<f64>>> = self
            .layers
            .iter()
            .map(|l| l.weights.iter().map(|row| vec![0.0; row.len()]).collect())
            .collect();
        let mut grad_biases: Vec<Vec<f64>> =
            self.layers.iter().map(|l| vec![0.0; l.biases.len()]).collect();

        let mut batch_loss = 0.0;

        for (&row, target) in rows.iter().zip(targets.iter()) {
            let activations = self.forward(row);
            let prediction = activations[last + 1][0];
            let error = prediction - target;
            batch_loss += error * error;

            // Output delta for the mean-squared-error loss.
            let mut delta = vec![2.0 * error / batch];

            for index in (0..self.layers.len()).rev() {
                let inputs = &activations[index];

                for (unit, d) in delta.iter().enumerate() {
                    grad_biases[index][unit] += d;
                    for (input_idx, a) in inputs.iter().enumerate() {
                        grad_weights[index][unit][input_idx] += d * a;
                    }
                }

                if index == 0 {
                    break;
                }

                // Propagate through the weights, gated by the rectifier of
                // the previous layer's activation.
                let mut next_delta = vec![0.0; inputs.len()];
                for (unit, d) in delta.iter().enumerate() {
                    for (input_idx, w) in self.layers[index].weights[unit].iter().enumerate() {
                        if inputs[input_idx] > 0.0 {
                            next_delta[input_idx] += d * w;
                        }
                    }
                }
                delta = next_delta;
            }
        }

        self.apply_adam(&grad_weights, &grad_biases, adam);
        batch_loss / batch
    }

    fn apply_adam(
        &mut self,
        grad_weights: &[Vec<Vec<f64>>],
        grad_biases: &[Vec<f64>],
        adam: &mut AdamState,
    ) {
        adam.step += 1;
        let lr = self.config.learning_rate;
        let bias1 = 1.0 - ADAM_BETA1.powi(adam.step as i32);
        let bias2 = 1.0 - ADAM_BETA2.powi(adam.step as i32);

        for (index, layer) in self.layers.iter_mut().enumerate() {
            for (unit, weights) in layer.weights.iter_mut().enumerate() {
                for (input_idx, w) in weights.iter_mut().enumerate() {
                    let g = grad_weights[index][unit][input_idx];
                    let m = &mut adam.m_weights[index][unit][input_idx];
                    let v = &mut adam.v_weights[index][unit][input_idx];
                    *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                    *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                    *w -= lr * (*m / bias1) / ((*v / bias2).sqrt() + ADAM_EPSILON);
                }

                let g = grad_biases[index][unit];
                let m = &mut adam.m_biases[index][unit];
                let v = &mut adam.v_biases[index][unit];
                *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                layer.biases[unit] -= lr * (*m / bias1) / ((*v / bias2).sqrt() + ADAM_EPSILON);
            }
        }
    }
}

impl DemandModel for NeuralModel {
    fn kind(&self) -> ModelKind {
        ModelKind::NeuralNetwork
    }

    fn fit(&mut self, train: &FeatureTable) -> Result<FitReport> {
        if train.is_empty() {
            anyhow::bail!("cannot train on an empty partition");
        }

        let scaler = StandardScaler::fit(&train.rows);
        let scaled = scaler.transform(&train.rows);

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let sizes = self.layer_sizes(train.feature_count());
        self.layers = sizes
            .windows(2)
            .map(|pair| Layer::init(pair[0], pair[1], &mut rng))
            .collect();

        // Trailing validation split, taken before any shuffling.
        let n_val = ((scaled.len() as f64) * self.config.validation_split).floor() as usize;
        let pivot = scaled.len() - n_val;
        let (fit_rows, val_rows) = scaled.split_at(pivot);
        let (fit_targets, val_targets) = train.target.split_at(pivot);

        let mut adam = AdamState::for_layers(&self.layers);
        let mut history = LossHistory {
            train: Vec::with_capacity(self.config.epochs),
            validation: Vec::with_capacity(self.config.epochs),
        };

        let mut order: Vec<usize> = (0..fit_rows.len()).collect();
        for _ in 0..self.config.epochs {
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            let mut batches = 0usize;
            for chunk in order.chunks(self.config.batch_size.max(1)) {
                let rows: Vec<&Vec<f64>> = chunk.iter().map(|&i| &fit_rows[i]).collect();
                let targets: Vec<f64> = chunk.iter().map(|&i| fit_targets[i]).collect();
                epoch_loss += self.train_batch(&rows, &targets, &mut adam);
                batches += 1;
            }

            history.train.push(epoch_loss / batches.max(1) as f64);
            // With no validation rows the trace mirrors the training loss.
            history.validation.push(if val_rows.is_empty() {
                *history.train.last().expect("epoch recorded")
            } else {
                self.mse(val_rows, val_targets)
            });
        }

        self.scaler = Some(scaler);

        Ok(FitReport {
            kind: self.kind(),
            training_samples: train.len(),
            loss_history: Some(history),
        })
    }

    fn predict(&self, test: &FeatureTable) -> Result<Vec<f64>> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("model not fitted"))?;

        let scaled = scaler.transform(&test.rows);
        Ok(scaled.iter().map(|row| self.predict_row(row)).collect())
    }
}
