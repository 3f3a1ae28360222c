//! Next-round grid synthesis around the values that performed best

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RegTuneError, Result};
use crate::hyperparameters::HyperparameterGrid;
use crate::narrowing::NarrowedRanges;

use super::SearchConfig;

/// Decisions taken after the first round and held for the rest of the search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundPlan {
    pub layer_count: usize,
    /// log10 of the learning rate the search centres on
    pub learning_magnitude: f64,
}

impl RoundPlan {
    pub fn from_first_round(narrowed: &NarrowedRanges, wide_search: bool) -> Result<Self> {
        let layer_count = narrowed
            .neuron_architecture
            .iter()
            .map(Vec::len)
            .min()
            .ok_or_else(|| RegTuneError::Config("no candidate architectures to narrow from".to_string()))?;
        let learning_magnitude = magnitude(&narrowed.learning_rate, 10.0, wide_search)
            .ok_or_else(|| RegTuneError::Config("no candidate learning rates to narrow from".to_string()))?;

        Ok(RoundPlan { layer_count, learning_magnitude })
    }
}

/// Mean logarithm of the top two values when `use_two` and two exist,
/// otherwise the logarithm of the most frequent one
pub fn magnitude(top_values: &[f64], base: f64, use_two: bool) -> Option<f64> {
    match top_values {
        [first, second, ..] if use_two => Some((first.log(base) + second.log(base)) / 2.0),
        [first, ..] => Some(first.log(base)),
        [] => None,
    }
}

/// `base^u` with `u` uniform in `[magnitude - spread, magnitude + spread]`
pub fn sample_log_uniform<R: Rng + ?Sized>(magnitude: f64, spread: f64, base: f64, rng: &mut R) -> f64 {
    base.powf(rng.random_range(magnitude - spread..=magnitude + spread))
}

/// Widths start from `initial_width`; each layer draws from
/// `[previous - step, previous]`, so widths never increase. Floor of 1.
pub fn generate_architecture<R: Rng + ?Sized>(
    layer_count: usize,
    initial_width: usize,
    step: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut width = initial_width.max(1);
    (0..layer_count)
        .map(|_| {
            let low = width.saturating_sub(step).max(1);
            width = rng.random_range(low..=width);
            width
        })
        .collect()
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Learning rates and architectures come from the fixed plan; batch sizes
/// centre on this round's top batch sizes; epoch counts carry over.
pub fn synthesize_next_grid<R: Rng + ?Sized>(
    narrowed: &NarrowedRanges,
    plan: &RoundPlan,
    config: &SearchConfig,
    rng: &mut R,
) -> Result<HyperparameterGrid> {
    let samples = config.samples_per_round;
    let spread = config.magnitude_spread;

    let mut learning_rate = Vec::with_capacity(samples);
    for _ in 0..samples {
        push_unique(&mut learning_rate, sample_log_uniform(plan.learning_magnitude, spread, 10.0, rng));
    }

    let mut neuron_architecture = Vec::with_capacity(samples);
    for _ in 0..samples {
        let architecture = generate_architecture(plan.layer_count, config.initial_width, config.width_step, rng);
        push_unique(&mut neuron_architecture, architecture);
    }

    let batch_magnitude = magnitude(
        &narrowed.batch_size.iter().map(|&b| b as f64).collect::<Vec<_>>(),
        2.0,
        true,
    )
    .ok_or_else(|| RegTuneError::Config("no candidate batch sizes to narrow from".to_string()))?;
    let mut batch_size = Vec::with_capacity(samples);
    for _ in 0..samples {
        let sampled = sample_log_uniform(batch_magnitude, spread, 2.0, rng).round().max(1.0) as usize;
        push_unique(&mut batch_size, sampled);
    }

    let grid = HyperparameterGrid {
        batch_size,
        epoch_count: narrowed.epoch_count.clone(),
        learning_rate,
        neuron_architecture,
    };
    grid.validate()?;
    Ok(grid)
}
