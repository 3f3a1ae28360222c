use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Activation applied after a layer's affine map: `ReLU` on hidden layers,
/// `Linear` on the scalar output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationType {
    ReLU,
    Linear,
}

impl ActivationType {
    /// Applies the activation function to a given input
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Linear => x,
        }
    }

    /// Computes the derivative of the activation function
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationType::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationType::Linear => 1.0,
        }
    }

    /// Element-wise activation over a batch of pre-activations
    pub fn forward(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            ActivationType::Linear => z.clone(),
            ActivationType::ReLU => z.mapv(|x| self.apply(x)),
        }
    }

    pub fn backward(&self, z: &Array2<f64>) -> Array2<f64> {
        z.mapv(|x| self.derivative(x))
    }
}
