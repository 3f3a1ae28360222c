pub mod feed_forward;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use crate::activation::ActivationType;

/// Trainable state of a dense layer plus the caches filled by the last
/// training forward pass. Caches and gradients are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerParams {
    pub neurons: usize,
    pub inputs: usize,
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: ActivationType,
    #[serde(skip)]
    pub weight_grads: Array2<f64>,
    #[serde(skip)]
    pub bias_grads: Array1<f64>,
    #[serde(skip)]
    pub input_cache: Array2<f64>,
    #[serde(skip)]
    pub preactivation_cache: Array2<f64>,
}

impl LayerParams {
    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }
}

pub use feed_forward::FeedForwardLayer;
