use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::activation::ActivationType;
use crate::error::{RegTuneError, Result};
use crate::layers::FeedForwardLayer;
use crate::loss::{rmse, Loss};
use crate::optimizer::{AdamConfig, Optimizer};

/// How a `train` call treats the state left by earlier calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    /// Keep current weights and optimizer moments
    Continue,
    /// Re-initialize weights and optimizer state before training
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSchedule {
    pub epoch_count: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

/// Feed-forward regression network: `Linear + ReLU` per hidden width, then a
/// single-output `Linear` layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionModel {
    pub layers: Vec<FeedForwardLayer>,
    pub loss: Loss,
    optimizer: Optimizer,
}

impl RegressionModel {
    /// Create a network for `input_width` features with the given hidden widths
    pub fn new<R: Rng + ?Sized>(input_width: usize, hidden: &[usize], rng: &mut R) -> Result<Self> {
        Self::with_optimizer(input_width, hidden, AdamConfig::default(), rng)
    }

    pub fn with_optimizer<R: Rng + ?Sized>(
        input_width: usize,
        hidden: &[usize],
        adam: AdamConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if hidden.is_empty() {
            return Err(RegTuneError::invalid("neuron_architecture", "[]", "at least one hidden layer is required"));
        }

        let mut layers = Vec::with_capacity(hidden.len() + 1);
        let mut inputs = input_width;
        for &neurons in hidden {
            layers.push(FeedForwardLayer::new(inputs, neurons, ActivationType::ReLU, rng)?);
            inputs = neurons;
        }
        layers.push(FeedForwardLayer::new(inputs, 1, ActivationType::Linear, rng)?);

        Ok(RegressionModel {
            layers,
            loss: Loss::MeanSquaredError,
            optimizer: Optimizer::with_config(0.0, adam),
        })
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map(|l| l.params().inputs).unwrap_or(0)
    }

    /// Hidden layer widths, input and output excluded
    pub fn architecture(&self) -> Vec<usize> {
        self.layers[..self.layers.len().saturating_sub(1)]
            .iter()
            .map(|l| l.params().neurons)
            .collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.params().parameter_count()).sum()
    }

    pub fn optimizer_steps(&self) -> u64 {
        self.optimizer.step_count()
    }

    /// Re-draw every layer's weights and forget optimizer moments
    pub fn reinitialize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        for layer in &mut self.layers {
            layer.initialize_weights(rng)?;
        }
        self.optimizer.reset();
        Ok(())
    }

    fn check_features(&self, features: &Array2<f64>) -> Result<()> {
        if features.ncols() != self.input_width() {
            return Err(RegTuneError::Shape {
                expected: format!("{} feature columns", self.input_width()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }
        Ok(())
    }

    fn check_targets(features: &Array2<f64>, targets: &Array1<f64>) -> Result<()> {
        if features.nrows() != targets.len() {
            return Err(RegTuneError::Shape {
                expected: format!("{} targets", features.nrows()),
                actual: format!("{} targets", targets.len()),
            });
        }
        Ok(())
    }

    fn forward(&mut self, input: &Array2<f64>) -> Array1<f64> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current);
        }
        current.index_axis_move(Axis(1), 0)
    }

    fn backward(&mut self, output_grad: &Array1<f64>) {
        let mut grad = output_grad.clone().insert_axis(Axis(1));
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad);
        }
    }

    /// One Adam step on the MSE of a single batch; returns the batch loss
    pub fn train_batch(&mut self, inputs: &Array2<f64>, targets: &Array1<f64>, learning_rate: f64) -> Result<f64> {
        self.check_features(inputs)?;
        Self::check_targets(inputs, targets)?;
        if inputs.nrows() == 0 {
            return Err(RegTuneError::Data("cannot train on an empty batch".to_string()));
        }
        self.optimizer.learning_rate = learning_rate;
        Ok(self.step_batch(inputs, targets))
    }

    fn step_batch(&mut self, inputs: &Array2<f64>, targets: &Array1<f64>) -> f64 {
        for layer in &mut self.layers {
            layer.zero_gradients();
        }

        let output = self.forward(inputs);
        let batch_loss = self.loss.calculate(&output, targets);
        let grad = self.loss.gradient(&output, targets);
        self.backward(&grad);

        self.optimizer.step(&mut self.layers);
        batch_loss
    }

    /// One shuffled pass over the data; returns the mean batch loss
    pub fn train_epoch<R: Rng + ?Sized>(
        &mut self,
        features: &Array2<f64>,
        targets: &Array1<f64>,
        batch_size: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<f64> {
        self.check_features(features)?;
        Self::check_targets(features, targets)?;
        if batch_size == 0 {
            return Err(RegTuneError::invalid("batch_size", 0, "must be positive"));
        }
        if features.nrows() == 0 {
            return Ok(0.0);
        }
        self.optimizer.learning_rate = learning_rate;

        let mut indices: Vec<usize> = (0..features.nrows()).collect();
        indices.shuffle(rng);

        let mut total_loss = 0.0;
        let mut batches = 0;
        for batch in indices.chunks(batch_size) {
            let inputs = features.select(Axis(0), batch);
            let labels = targets.select(Axis(0), batch);
            total_loss += self.step_batch(&inputs, &labels);
            batches += 1;
        }

        let mean_loss = total_loss / batches as f64;
        if !mean_loss.is_finite() {
            return Err(RegTuneError::Training(format!("loss diverged to {}", mean_loss)));
        }
        Ok(mean_loss)
    }

    /// Mini-batch training. Returns the mean batch loss of the final epoch.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        features: &Array2<f64>,
        targets: &Array1<f64>,
        schedule: &TrainingSchedule,
        mode: TrainingMode,
        rng: &mut R,
    ) -> Result<f64> {
        if mode == TrainingMode::Reset {
            self.reinitialize(rng)?;
        }

        let mut loss = 0.0;
        for epoch in 0..schedule.epoch_count {
            loss = self.train_epoch(features, targets, schedule.batch_size, schedule.learning_rate, rng)?;
            debug!(epoch, loss, "epoch complete");
        }
        Ok(loss)
    }

    /// Deterministic forward pass; outputs are in target units
    pub fn predict(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_features(features)?;
        let mut current = features.clone();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        Ok(current.index_axis_move(Axis(1), 0))
    }

    /// Root mean squared error of the predictions
    pub fn score(&self, features: &Array2<f64>, targets: &Array1<f64>) -> Result<f64> {
        Self::check_targets(features, targets)?;
        let predictions = self.predict(features)?;
        Ok(rmse(&predictions, targets))
    }
}
