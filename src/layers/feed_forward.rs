use crate::activation::ActivationType;
use crate::error::{RegTuneError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use super::LayerParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardLayer {
    pub params: LayerParams,
}

impl FeedForwardLayer {
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        neurons: usize,
        activation: ActivationType,
        rng: &mut R,
    ) -> Result<Self> {
        if inputs == 0 || neurons == 0 {
            return Err(RegTuneError::Shape {
                expected: "positive layer dimensions".to_string(),
                actual: format!("{} inputs x {} neurons", inputs, neurons),
            });
        }

        let params = LayerParams {
            neurons,
            inputs,
            // weights are (neurons × inputs)
            weights: Array2::zeros((neurons, inputs)),
            bias: Array1::zeros(neurons),
            activation,
            weight_grads: Array2::zeros((neurons, inputs)),
            bias_grads: Array1::zeros(neurons),
            input_cache: Array2::zeros((0, inputs)),
            preactivation_cache: Array2::zeros((0, neurons)),
        };

        let mut layer = FeedForwardLayer { params };
        layer.initialize_weights(rng)?;
        Ok(layer)
    }

    /// Xavier/Glorot uniform weights, zero biases
    pub fn initialize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let fan_sum = (self.params.inputs + self.params.neurons) as f64;
        let limit = (6.0 / fan_sum).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit)
            .map_err(|e| RegTuneError::Training(format!("weight initialisation: {}", e)))?;

        let (neurons, inputs) = (self.params.neurons, self.params.inputs);
        self.params.weights = Array2::from_shape_fn((neurons, inputs), |_| dist.sample(rng));
        self.params.bias = Array1::zeros(neurons);
        self.zero_gradients();
        Ok(())
    }

    /// Training forward pass over a (batch × inputs) matrix; caches what backward needs
    pub fn forward(&mut self, input: &Array2<f64>) -> Array2<f64> {
        assert_eq!(input.ncols(), self.params.inputs, "Input size does not match layer's input size");

        let z = input.dot(&self.params.weights.t()) + &self.params.bias;
        let output = self.params.activation.forward(&z);
        self.params.input_cache = input.clone();
        self.params.preactivation_cache = z;
        output
    }

    /// Forward pass without touching the caches
    pub fn infer(&self, input: &Array2<f64>) -> Array2<f64> {
        assert_eq!(input.ncols(), self.params.inputs, "Input size does not match layer's input size");

        let z = input.dot(&self.params.weights.t()) + &self.params.bias;
        self.params.activation.forward(&z)
    }

    /// Accumulates parameter gradients and returns the gradient w.r.t. the layer input
    pub fn backward(&mut self, grad_output: &Array2<f64>) -> Array2<f64> {
        let dz = match self.params.activation {
            ActivationType::Linear => grad_output.clone(),
            activation => grad_output * &activation.backward(&self.params.preactivation_cache),
        };

        // (neurons × batch) · (batch × inputs)
        self.params.weight_grads = &self.params.weight_grads + &dz.t().dot(&self.params.input_cache);
        self.params.bias_grads = &self.params.bias_grads + &dz.sum_axis(Axis(0));

        dz.dot(&self.params.weights)
    }

    pub fn zero_gradients(&mut self) {
        self.params.weight_grads = Array2::zeros((self.params.neurons, self.params.inputs));
        self.params.bias_grads = Array1::zeros(self.params.neurons);
    }

    pub fn params(&self) -> &LayerParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut LayerParams {
        &mut self.params
    }
}
