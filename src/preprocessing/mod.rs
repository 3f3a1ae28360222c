//! Deterministic preprocessing: imputation, one-hot encoding, min-max scaling.
//!
//! `Preprocessor::fit_transform` is the only place state is learned. The
//! returned `FittedPreprocessor` is immutable and applies the same fill
//! values, vocabulary and scaling to every later call.

pub mod encoder;
pub mod imputer;
pub mod scaler;

use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{RegTuneError, Result};

pub use encoder::{CategoryVocabulary, UnknownCategoryPolicy};
pub use imputer::{ImputationState, ImputeStrategy};
pub use scaler::ScalingState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Numeric columns imputed with the mean; all others use the median
    pub mean_imputed_columns: Vec<String>,
    /// Fixed vocabulary; learned from the fitting rows when `None`
    pub categories: Option<Vec<String>>,
    pub unknown_category: UnknownCategoryPolicy,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        PreprocessorConfig {
            mean_imputed_columns: vec![
                "longitude".to_string(),
                "latitude".to_string(),
                "median_income".to_string(),
            ],
            categories: None,
            unknown_category: UnknownCategoryPolicy::AllZeros,
        }
    }
}

impl PreprocessorConfig {
    pub fn with_categories<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.categories = Some(labels.iter().map(|l| l.as_ref().to_string()).collect());
        self
    }

    pub fn with_unknown_category(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_category = policy;
        self
    }

    pub fn with_mean_imputed<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.mean_imputed_columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessorConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Preprocessor { config }
    }

    /// Learn fill values, vocabulary and scaling from `training`, and return
    /// the training matrix transformed with them
    pub fn fit_transform(&self, training: &Dataset) -> Result<(Array2<f64>, FittedPreprocessor)> {
        let imputation = ImputationState::fit(training, &self.config.mean_imputed_columns)?;

        let vocabulary = match &self.config.categories {
            Some(labels) => CategoryVocabulary::from_labels(labels),
            None => CategoryVocabulary::learn(&imputation.fill_categorical(training)?),
        };
        if vocabulary.is_empty() {
            return Err(RegTuneError::Preprocessing(format!(
                "column '{}' has no labels to build a vocabulary from",
                training.categorical_name()
            )));
        }

        let encoded = encode(training, &imputation, &vocabulary, self.config.unknown_category)?;
        let scaling = ScalingState::fit(&encoded)?;
        let matrix = scaling.transform(&encoded)?;

        debug!(
            rows = matrix.nrows(),
            width = matrix.ncols(),
            categories = vocabulary.len(),
            "preprocessor fitted"
        );

        let fitted = FittedPreprocessor {
            config: self.config.clone(),
            imputation,
            vocabulary,
            scaling,
        };
        Ok((matrix, fitted))
    }
}

/// Preprocessing state learned from a training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    config: PreprocessorConfig,
    imputation: ImputationState,
    vocabulary: CategoryVocabulary,
    scaling: ScalingState,
}

impl FittedPreprocessor {
    pub fn transform(&self, rows: &Dataset) -> Result<Array2<f64>> {
        let encoded = encode(rows, &self.imputation, &self.vocabulary, self.config.unknown_category)?;
        self.scaling.transform(&encoded)
    }

    /// Width of the transformed matrix: numeric columns plus one-hot columns
    pub fn output_width(&self) -> usize {
        self.scaling.width()
    }

    pub fn scaling(&self) -> &ScalingState {
        &self.scaling
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    pub fn imputation(&self) -> &ImputationState {
        &self.imputation
    }
}

/// Impute, then append the one-hot columns after the numeric ones
fn encode(
    rows: &Dataset,
    imputation: &ImputationState,
    vocabulary: &CategoryVocabulary,
    policy: UnknownCategoryPolicy,
) -> Result<Array2<f64>> {
    let numeric = imputation.fill_numeric(rows)?;
    let labels = imputation.fill_categorical(rows)?;
    let one_hot = vocabulary.encode(rows.categorical_name(), &labels, policy)?;

    concatenate(Axis(1), &[numeric.view(), one_hot.view()])
        .map_err(|e| RegTuneError::Preprocessing(e.to_string()))
}
