//! Multi-round, self-narrowing hyperparameter search.
//!
//! Each round holds out a validation split, cross-validates every grid
//! configuration on the rest in parallel, keeps the configurations scoring
//! within `candidate_threshold` of the round's best, and samples the next
//! grid around their most frequent values. A round whose best mean score is
//! worse than the previous best ends the search with the previous best.

pub mod cross_validation;
pub mod sampling;

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::error::{RegTuneError, Result};
use crate::estimator::{Estimator, FitOptions};
use crate::hyperparameters::{HyperparameterGrid, ModelHyperparameters};
use crate::narrowing::{narrow, NarrowedRanges};
use crate::pipeline::TrainedModel;

pub use cross_validation::{k_fold, train_validation_split, CVSplit};
pub use sampling::{generate_architecture, synthesize_next_grid, RoundPlan};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-epoch early stopping threshold on validation RMSE; 0 disables
    pub min_improvement: f64,
    /// Absolute score distance from the round's best that still counts as a candidate
    pub candidate_threshold: f64,
    /// Maximum number of rounds
    pub iterations: usize,
    /// Centre the learning rate on the top two values instead of the top one
    pub wide_search: bool,
    pub folds: usize,
    pub validation_fraction: f64,
    /// Width the architecture generator starts from
    pub initial_width: usize,
    /// Largest width drop between consecutive generated layers
    pub width_step: usize,
    /// Values sampled per hyperparameter for each new round
    pub samples_per_round: usize,
    /// Half-width of the sampling window, in decades (learning rate) or bits (batch size)
    pub magnitude_spread: f64,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            min_improvement: 0.1,
            candidate_threshold: 0.05,
            iterations: 3,
            wide_search: true,
            folds: 5,
            validation_fraction: 0.1,
            initial_width: 13,
            width_step: 3,
            samples_per_round: 4,
            magnitude_spread: 0.3,
            seed: 42,
        }
    }
}

impl SearchConfig {
    pub fn with_min_improvement(mut self, min_improvement: f64) -> Self {
        self.min_improvement = min_improvement;
        self
    }

    pub fn with_candidate_threshold(mut self, threshold: f64) -> Self {
        self.candidate_threshold = threshold;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_wide_search(mut self, wide_search: bool) -> Self {
        self.wide_search = wide_search;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_samples_per_round(mut self, samples: usize) -> Self {
        self.samples_per_round = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(RegTuneError::invalid("iterations", 0, "at least one round is required"));
        }
        if self.folds < 2 {
            return Err(RegTuneError::invalid("folds", self.folds, "must be at least 2"));
        }
        if self.samples_per_round == 0 {
            return Err(RegTuneError::invalid("samples_per_round", 0, "must be positive"));
        }
        if self.initial_width == 0 {
            return Err(RegTuneError::invalid("initial_width", 0, "must be positive"));
        }
        if !(self.min_improvement >= 0.0) {
            return Err(RegTuneError::invalid("min_improvement", self.min_improvement, "must be non-negative"));
        }
        if !(self.candidate_threshold >= 0.0) {
            return Err(RegTuneError::invalid(
                "candidate_threshold",
                self.candidate_threshold,
                "must be non-negative",
            ));
        }
        if !(self.magnitude_spread >= 0.0 && self.magnitude_spread.is_finite()) {
            return Err(RegTuneError::invalid(
                "magnitude_spread",
                self.magnitude_spread,
                "must be finite and non-negative",
            ));
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            return Err(RegTuneError::invalid(
                "validation_fraction",
                self.validation_fraction,
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Cooperative cancellation, checked before each round and each trial
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Cross-validation result of one configuration. Scores are negative RMSE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub params: ModelHyperparameters,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRound {
    pub round: usize,
    pub grid: HyperparameterGrid,
    pub trials: Vec<TrialResult>,
    pub best_params: ModelHyperparameters,
    pub best_score: f64,
    pub candidates: Vec<ModelHyperparameters>,
    pub narrowed: NarrowedRanges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best: ModelHyperparameters,
    pub best_score: f64,
    /// Every scored round, including one that regressed and ended the search
    pub rounds: Vec<SearchRound>,
    /// Set when a round regressed or the search was cancelled
    pub stopped_early: bool,
}

pub struct HyperparameterSearch<E = TrainedModel> {
    config: SearchConfig,
    _estimator: PhantomData<fn() -> E>,
}

impl<E: Estimator> HyperparameterSearch<E> {
    pub fn new(config: SearchConfig) -> Self {
        HyperparameterSearch {
            config,
            _estimator: PhantomData,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn run(&self, data: &Dataset, initial_grid: HyperparameterGrid) -> Result<SearchOutcome> {
        self.run_with_cancel(data, initial_grid, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        data: &Dataset,
        initial_grid: HyperparameterGrid,
        cancel: &CancelToken,
    ) -> Result<SearchOutcome> {
        self.config.validate()?;
        initial_grid.validate()?;
        data.targets()?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut grid = initial_grid;
        let mut best: Option<(ModelHyperparameters, f64)> = None;
        let mut plan: Option<RoundPlan> = None;
        let mut rounds: Vec<SearchRound> = Vec::new();

        for round in 1..=self.config.iterations {
            if cancel.is_cancelled() {
                return Self::cancelled(best, rounds);
            }

            let (train_rows, validation_rows) =
                train_validation_split(data.len(), self.config.validation_fraction, &mut rng)?;
            let training = data.select(&train_rows)?;
            let validation = data.select(&validation_rows)?;

            info!(round, configurations = grid.len(), rows = training.len(), "starting search round");

            let trials = match self.evaluate_grid(&training, &validation, &grid, &mut rng, cancel) {
                Err(RegTuneError::Cancelled) => return Self::cancelled(best, rounds),
                other => other?,
            };

            let (best_idx, current_best) = trials
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |acc, (idx, trial)| {
                    if trial.mean_score > acc.1 { (idx, trial.mean_score) } else { acc }
                });
            if current_best == f64::NEG_INFINITY {
                return Err(RegTuneError::Training(format!("every trial in round {} failed to train", round)));
            }

            let best_params = trials[best_idx].params.clone();
            let threshold = current_best - self.config.candidate_threshold;
            let candidates: Vec<ModelHyperparameters> = trials
                .iter()
                .filter(|t| t.mean_score >= threshold)
                .map(|t| t.params.clone())
                .collect();
            let narrowed = narrow(&candidates);
            let record = SearchRound {
                round,
                grid,
                trials,
                best_params: best_params.clone(),
                best_score: current_best,
                candidates,
                narrowed,
            };

            if let Some((previous_params, previous_score)) = &best {
                if current_best < *previous_score {
                    warn!(
                        round,
                        current_best,
                        previous_best = *previous_score,
                        "round scored worse than the previous best, stopping"
                    );
                    let (best, best_score) = (previous_params.clone(), *previous_score);
                    rounds.push(record);
                    return Ok(SearchOutcome {
                        best,
                        best_score,
                        rounds,
                        stopped_early: true,
                    });
                }
            }

            best = Some((best_params.clone(), current_best));

            let round_plan = match plan {
                Some(p) => p,
                None => {
                    let p = RoundPlan::from_first_round(&record.narrowed, self.config.wide_search)?;
                    info!(layer_count = p.layer_count, learning_magnitude = p.learning_magnitude, "search plan fixed");
                    plan = Some(p);
                    p
                }
            };

            info!(
                round,
                best_score = current_best,
                candidates = record.candidates.len(),
                best = ?best_params,
                "search round complete"
            );
            debug!(narrowed = ?record.narrowed, "narrowed ranges");

            let next_grid = if round < self.config.iterations {
                Some(synthesize_next_grid(&record.narrowed, &round_plan, &self.config, &mut rng)?)
            } else {
                None
            };

            rounds.push(record);

            match next_grid {
                Some(next) => grid = next,
                None => break,
            }
        }

        let (best, best_score) = best.ok_or(RegTuneError::Cancelled)?;
        Ok(SearchOutcome {
            best,
            best_score,
            rounds,
            stopped_early: false,
        })
    }

    fn cancelled(best: Option<(ModelHyperparameters, f64)>, rounds: Vec<SearchRound>) -> Result<SearchOutcome> {
        let (best, best_score) = best.ok_or(RegTuneError::Cancelled)?;
        warn!(completed_rounds = rounds.len(), "search cancelled, returning best so far");
        Ok(SearchOutcome {
            best,
            best_score,
            rounds,
            stopped_early: true,
        })
    }

    /// k-fold CV of every configuration. Trial seeds are drawn up front so the
    /// outcome does not depend on how rayon schedules the trials.
    fn evaluate_grid(
        &self,
        training: &Dataset,
        validation: &Dataset,
        grid: &HyperparameterGrid,
        rng: &mut ChaCha8Rng,
        cancel: &CancelToken,
    ) -> Result<Vec<TrialResult>> {
        let configs = grid.configurations();
        let folds: Vec<(Dataset, Dataset)> = k_fold(training.len(), self.config.folds, rng)?
            .iter()
            .map(|split| Ok((training.select(&split.train_indices)?, training.select(&split.test_indices)?)))
            .collect::<Result<_>>()?;

        let jobs: Vec<(usize, usize, u64)> = (0..configs.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .map(|(c, f)| (c, f, rng.random::<u64>()))
            .collect();

        let options = FitOptions {
            validation: (!validation.is_empty()).then_some(validation),
            min_improvement: self.config.min_improvement,
        };

        let scores: Vec<(usize, usize, f64)> = jobs
            .into_par_iter()
            .map(|(c, f, seed)| {
                if cancel.is_cancelled() {
                    return Err(RegTuneError::Cancelled);
                }
                let (fit_rows, held_out) = &folds[f];
                let mut trial_rng = ChaCha8Rng::seed_from_u64(seed);
                let score = match E::fit(fit_rows, &configs[c], &options, &mut trial_rng) {
                    Ok(model) => -model.score(held_out)?,
                    Err(RegTuneError::Training(reason)) => {
                        warn!(params = ?configs[c], fold = f, %reason, "trial failed to train");
                        f64::NEG_INFINITY
                    }
                    Err(e) => return Err(e),
                };
                let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
                debug!(params = ?configs[c], fold = f, score, "trial complete");
                Ok((c, f, score))
            })
            .collect::<Result<_>>()?;
        // a round cut short by cancellation is not scored
        if cancel.is_cancelled() {
            return Err(RegTuneError::Cancelled);
        }

        let mut fold_scores = vec![vec![0.0; folds.len()]; configs.len()];
        for (c, f, score) in scores {
            fold_scores[c][f] = score;
        }

        Ok(configs
            .into_iter()
            .zip(fold_scores)
            .map(|(params, fold_scores)| {
                let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                TrialResult { params, fold_scores, mean_score }
            })
            .collect())
    }
}

/// Run the default search over the full training pipeline and return the best configuration
pub fn search(
    data: &Dataset,
    initial_grid: HyperparameterGrid,
    min_improvement: f64,
    candidate_threshold: f64,
    iterations: usize,
    wide_search: bool,
) -> Result<ModelHyperparameters> {
    let config = SearchConfig::default()
        .with_min_improvement(min_improvement)
        .with_candidate_threshold(candidate_threshold)
        .with_iterations(iterations)
        .with_wide_search(wide_search);
    HyperparameterSearch::<TrainedModel>::new(config)
        .run(data, initial_grid)
        .map(|outcome| outcome.best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_values() {
        assert!(SearchConfig::default().with_iterations(0).validate().is_err());
        assert!(SearchConfig::default().with_folds(1).validate().is_err());
        assert!(SearchConfig::default().with_samples_per_round(0).validate().is_err());
        assert!(SearchConfig::default().with_min_improvement(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());

        let expired = CancelToken::new().with_deadline(Instant::now());
        assert!(expired.is_cancelled());
    }
}
