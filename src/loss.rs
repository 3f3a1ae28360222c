use ndarray::Array1;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Loss {
    MeanSquaredError,
}

impl Loss {
    pub fn calculate(&self, prediction: &Array1<f64>, target: &Array1<f64>) -> f64 {
        match self {
            Loss::MeanSquaredError => {
                if prediction.is_empty() {
                    return 0.0;
                }
                let diff = prediction - target;
                diff.mapv(|d| d * d).sum() / prediction.len() as f64
            }
        }
    }

    /// Gradient of the loss with respect to each prediction
    pub fn gradient(&self, prediction: &Array1<f64>, target: &Array1<f64>) -> Array1<f64> {
        match self {
            Loss::MeanSquaredError => {
                let n = prediction.len().max(1) as f64;
                (prediction - target) * (2.0 / n)
            }
        }
    }
}

/// Root mean squared error: sum of squared per-sample errors over the sample count, square-rooted
pub fn rmse(prediction: &Array1<f64>, target: &Array1<f64>) -> f64 {
    if prediction.is_empty() {
        return 0.0;
    }
    let total: f64 = prediction
        .iter()
        .zip(target.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    (total / prediction.len() as f64).sqrt()
}
