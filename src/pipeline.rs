//! Preprocessor and network bundled into one trainable, persistable unit

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::estimator::{Estimator, FitOptions};
use crate::hyperparameters::ModelHyperparameters;
use crate::model::{RegressionModel, TrainingMode, TrainingSchedule};
use crate::preprocessing::{FittedPreprocessor, Preprocessor, PreprocessorConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    hyperparameters: ModelHyperparameters,
    preprocessor: FittedPreprocessor,
    network: RegressionModel,
}

impl TrainedModel {
    /// Fit preprocessing on `data`, build a network whose input width matches
    /// the preprocessed width, and train it
    pub fn fit_with<R: Rng + ?Sized>(
        data: &Dataset,
        params: &ModelHyperparameters,
        preprocessing: &PreprocessorConfig,
        options: &FitOptions<'_>,
        rng: &mut R,
    ) -> Result<Self> {
        params.validate()?;
        let targets = data.targets()?;
        let (features, preprocessor) = Preprocessor::new(preprocessing.clone()).fit_transform(data)?;
        let network = RegressionModel::new(features.ncols(), &params.neuron_architecture, rng)?;

        let mut model = TrainedModel {
            hyperparameters: params.clone(),
            preprocessor,
            network,
        };

        let validation = match options.validation {
            Some(rows) if options.min_improvement > 0.0 => {
                Some((model.preprocessor.transform(rows)?, rows.targets()?))
            }
            _ => None,
        };

        let mut previous = f64::INFINITY;
        for epoch in 0..params.epoch_count {
            let loss = model
                .network
                .train_epoch(&features, &targets, params.batch_size, params.learning_rate, rng)?;

            if let Some((val_features, val_targets)) = &validation {
                let current = model.network.score(val_features, val_targets)?;
                debug!(epoch, loss, validation_rmse = current, "epoch complete");
                if previous.is_finite()
                    && (previous == 0.0 || 1.0 - current / previous < options.min_improvement)
                {
                    debug!(epoch, "validation improvement below threshold, stopping");
                    break;
                }
                previous = current;
            } else {
                debug!(epoch, loss, "epoch complete");
            }
        }

        Ok(model)
    }

    /// Further training on new or repeated rows. Preprocessing state is reused as fitted.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        data: &Dataset,
        schedule: &TrainingSchedule,
        mode: TrainingMode,
        rng: &mut R,
    ) -> Result<f64> {
        let features = self.preprocessor.transform(data)?;
        let targets = data.targets()?;
        self.network.train(&features, &targets, schedule, mode, rng)
    }

    /// Continue from the current weights with the stored batch size and learning rate
    pub fn continue_training<R: Rng + ?Sized>(
        &mut self,
        data: &Dataset,
        epoch_count: usize,
        rng: &mut R,
    ) -> Result<f64> {
        let schedule = TrainingSchedule {
            epoch_count,
            batch_size: self.hyperparameters.batch_size,
            learning_rate: self.hyperparameters.learning_rate,
        };
        self.train(data, &schedule, TrainingMode::Continue, rng)
    }

    pub fn hyperparameters(&self) -> &ModelHyperparameters {
        &self.hyperparameters
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn network(&self) -> &RegressionModel {
        &self.network
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        info!(path = %path.as_ref().display(), "saved trained model");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model = Self::from_reader(BufReader::new(File::open(path.as_ref())?))?;
        info!(path = %path.as_ref().display(), "loaded trained model");
        Ok(model)
    }
}

impl Estimator for TrainedModel {
    fn fit<R: Rng + ?Sized>(
        data: &Dataset,
        params: &ModelHyperparameters,
        options: &FitOptions<'_>,
        rng: &mut R,
    ) -> Result<Self> {
        Self::fit_with(data, params, &PreprocessorConfig::default(), options, rng)
    }

    fn predict(&self, data: &Dataset) -> Result<Array1<f64>> {
        let features = self.preprocessor.transform(data)?;
        self.network.predict(&features)
    }
}

/// Train a model with default preprocessing
pub fn fit<R: Rng + ?Sized>(
    training: &Dataset,
    params: &ModelHyperparameters,
    rng: &mut R,
) -> Result<TrainedModel> {
    <TrainedModel as Estimator>::fit(training, params, &FitOptions::default(), rng)
}

pub fn predict(model: &TrainedModel, features: &Dataset) -> Result<Array1<f64>> {
    model.predict(features)
}

/// RMSE of the model on rows carrying a target column
pub fn score(model: &TrainedModel, data: &Dataset) -> Result<f64> {
    model.score(data)
}
