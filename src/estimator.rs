use ndarray::Array1;
use rand::Rng;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::hyperparameters::ModelHyperparameters;
use crate::loss::rmse;

/// Extra inputs to a fit beyond the training rows and hyperparameters
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOptions<'a> {
    /// Held-out rows watched after every epoch
    pub validation: Option<&'a Dataset>,
    /// Stop once validation RMSE improves by a smaller fraction than this; 0 disables
    pub min_improvement: f64,
}

/// Anything the search controller can train and evaluate on raw datasets
pub trait Estimator: Sized + Send {
    fn fit<R: Rng + ?Sized>(
        data: &Dataset,
        params: &ModelHyperparameters,
        options: &FitOptions<'_>,
        rng: &mut R,
    ) -> Result<Self>;

    fn predict(&self, data: &Dataset) -> Result<Array1<f64>>;

    /// RMSE against the dataset's target column
    fn score(&self, data: &Dataset) -> Result<f64> {
        let targets = data.targets()?;
        let predictions = self.predict(data)?;
        Ok(rmse(&predictions, &targets))
    }
}
