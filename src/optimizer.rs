use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::layers::FeedForwardLayer;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        AdamConfig {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Moments {
    m_weights: Array2<f64>,
    v_weights: Array2<f64>,
    m_bias: Array1<f64>,
    v_bias: Array1<f64>,
}

/// Adam optimizer. Moment estimates live here, one entry per layer, and
/// survive across batches, epochs and continued training calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Optimizer {
    pub learning_rate: f64,
    pub config: AdamConfig,
    step_count: u64,
    moments: Vec<Moments>,
}

impl Optimizer {
    pub fn new(learning_rate: f64) -> Self {
        Self::with_config(learning_rate, AdamConfig::default())
    }

    pub fn with_config(learning_rate: f64, config: AdamConfig) -> Self {
        Self {
            learning_rate,
            config,
            step_count: 0,
            moments: Vec::new(),
        }
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Drop all moment estimates and the step counter
    pub fn reset(&mut self) {
        self.step_count = 0;
        self.moments.clear();
    }

    fn ensure_moments(&mut self, layers: &[FeedForwardLayer]) {
        if self.moments.len() == layers.len() {
            return;
        }
        self.moments = layers
            .iter()
            .map(|layer| {
                let p = layer.params();
                Moments {
                    m_weights: Array2::zeros(p.weights.raw_dim()),
                    v_weights: Array2::zeros(p.weights.raw_dim()),
                    m_bias: Array1::zeros(p.bias.len()),
                    v_bias: Array1::zeros(p.bias.len()),
                }
            })
            .collect();
    }

    /// One bias-corrected Adam update from the gradients accumulated in each layer
    pub fn step(&mut self, layers: &mut [FeedForwardLayer]) {
        self.ensure_moments(layers);
        self.step_count += 1;

        let AdamConfig { beta1, beta2, epsilon } = self.config;
        let t = self.step_count as f64;
        let correction1 = 1.0 - beta1.powf(t);
        let correction2 = 1.0 - beta2.powf(t);
        let lr = self.learning_rate;

        for (layer, moments) in layers.iter_mut().zip(self.moments.iter_mut()) {
            let params = layer.params_mut();

            moments.m_weights = &moments.m_weights * beta1 + &params.weight_grads * (1.0 - beta1);
            moments.v_weights = &moments.v_weights * beta2 + &params.weight_grads.mapv(|g| g * g) * (1.0 - beta2);
            moments.m_bias = &moments.m_bias * beta1 + &params.bias_grads * (1.0 - beta1);
            moments.v_bias = &moments.v_bias * beta2 + &params.bias_grads.mapv(|g| g * g) * (1.0 - beta2);

            let weight_update = ndarray::Zip::from(&moments.m_weights)
                .and(&moments.v_weights)
                .map_collect(|&m, &v| lr * (m / correction1) / ((v / correction2).sqrt() + epsilon));
            let bias_update = ndarray::Zip::from(&moments.m_bias)
                .and(&moments.v_bias)
                .map_collect(|&m, &v| lr * (m / correction1) / ((v / correction2).sqrt() + epsilon));

            params.weights = &params.weights - &weight_update;
            params.bias = &params.bias - &bias_update;
        }
    }
}
