mod activation;
mod dataset;
mod error;
mod estimator;
mod hyperparameters;
mod layers;
mod loss;
mod model;
mod narrowing;
mod optimizer;
mod pipeline;
pub mod preprocessing;
pub mod search;

pub use activation::ActivationType;
pub use dataset::{Dataset, DatasetBuilder};
pub use error::{RegTuneError, Result};
pub use estimator::{Estimator, FitOptions};
pub use hyperparameters::{HyperparameterGrid, ModelHyperparameters};
pub use layers::{FeedForwardLayer, LayerParams};
pub use loss::{rmse, Loss};
pub use model::{RegressionModel, TrainingMode, TrainingSchedule};
pub use narrowing::{most_frequent, narrow, NarrowedRanges};
pub use optimizer::{AdamConfig, Optimizer};
pub use pipeline::{fit, predict, score, TrainedModel};
pub use preprocessing::{FittedPreprocessor, Preprocessor, PreprocessorConfig};
pub use search::{search, CancelToken, HyperparameterSearch, SearchConfig, SearchOutcome, SearchRound, TrialResult};
