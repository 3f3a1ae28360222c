use serde::{Deserialize, Serialize};

use crate::error::{RegTuneError, Result};

/// Hyperparameters for the regression network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHyperparameters {
    /// Number of training epochs
    pub epoch_count: usize,

    /// Adam step size
    pub learning_rate: f64,

    /// Hidden layer widths; the input width is prepended by the model
    pub neuron_architecture: Vec<usize>,

    /// Batch size for training
    pub batch_size: usize,
}

impl Default for ModelHyperparameters {
    fn default() -> Self {
        ModelHyperparameters {
            epoch_count: 500,
            learning_rate: 0.01,
            neuron_architecture: vec![13, 9],
            batch_size: 32,
        }
    }
}

impl ModelHyperparameters {
    pub fn validate(&self) -> Result<()> {
        if self.epoch_count == 0 {
            return Err(RegTuneError::invalid("epoch_count", self.epoch_count, "must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RegTuneError::invalid("learning_rate", self.learning_rate, "must be positive and finite"));
        }
        if self.neuron_architecture.is_empty() || self.neuron_architecture.contains(&0) {
            return Err(RegTuneError::invalid(
                "neuron_architecture",
                format!("{:?}", self.neuron_architecture),
                "must be a non-empty list of positive widths",
            ));
        }
        if self.batch_size == 0 {
            return Err(RegTuneError::invalid("batch_size", self.batch_size, "must be positive"));
        }
        Ok(())
    }
}

/// Candidate values per hyperparameter. Trials cover the full Cartesian product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperparameterGrid {
    pub batch_size: Vec<usize>,
    pub epoch_count: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub neuron_architecture: Vec<Vec<usize>>,
}

impl Default for HyperparameterGrid {
    fn default() -> Self {
        HyperparameterGrid {
            batch_size: vec![64, 128, 256, 512],
            epoch_count: vec![1000],
            learning_rate: vec![0.001, 0.01, 0.1, 1.0],
            neuron_architecture: vec![vec![9], vec![9, 9], vec![9, 9, 9], vec![9, 9, 9, 9]],
        }
    }
}

impl HyperparameterGrid {
    /// Fails fast on empty value lists or values no model could be built with
    pub fn validate(&self) -> Result<()> {
        let empty = [
            ("batch_size", self.batch_size.is_empty()),
            ("epoch_count", self.epoch_count.is_empty()),
            ("learning_rate", self.learning_rate.is_empty()),
            ("neuron_architecture", self.neuron_architecture.is_empty()),
        ];
        if let Some((name, _)) = empty.iter().find(|(_, is_empty)| *is_empty) {
            return Err(RegTuneError::Config(format!("hyperparameter grid has no values for '{}'", name)));
        }
        self.configurations().iter().try_for_each(ModelHyperparameters::validate)
    }

    pub fn len(&self) -> usize {
        self.batch_size.len() * self.epoch_count.len() * self.learning_rate.len() * self.neuron_architecture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cartesian product, batch_size outermost and neuron_architecture varying fastest
    pub fn configurations(&self) -> Vec<ModelHyperparameters> {
        let mut configs = Vec::with_capacity(self.len());
        for &batch_size in &self.batch_size {
            for &epoch_count in &self.epoch_count {
                for &learning_rate in &self.learning_rate {
                    for architecture in &self.neuron_architecture {
                        configs.push(ModelHyperparameters {
                            epoch_count,
                            learning_rate,
                            neuron_architecture: architecture.clone(),
                            batch_size,
                        });
                    }
                }
            }
        }
        configs
    }
}
