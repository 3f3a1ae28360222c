//! Top-k value extraction over a set of candidate configurations

use serde::{Deserialize, Serialize};

use crate::hyperparameters::ModelHyperparameters;

/// At most two most frequent values per hyperparameter, most frequent first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrowedRanges {
    pub epoch_count: Vec<usize>,
    pub learning_rate: Vec<f64>,
    pub neuron_architecture: Vec<Vec<usize>>,
    pub batch_size: Vec<usize>,
}

/// The `k` most frequent values, ties broken by first-seen order.
///
/// Uses `PartialEq` rather than hashing so float values work; candidate sets
/// are small.
pub fn most_frequent<T: PartialEq + Clone>(values: &[T], k: usize) -> Vec<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(seen, _)| seen == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value.clone(), 1)),
        }
    }
    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().take(k).map(|(value, _)| value).collect()
}

fn top_two<T, F>(candidates: &[ModelHyperparameters], extract: F) -> Vec<T>
where
    T: PartialEq + Clone,
    F: Fn(&ModelHyperparameters) -> T,
{
    let values: Vec<T> = candidates.iter().map(extract).collect();
    most_frequent(&values, 2)
}

pub fn narrow(candidates: &[ModelHyperparameters]) -> NarrowedRanges {
    NarrowedRanges {
        epoch_count: top_two(candidates, |c| c.epoch_count),
        learning_rate: top_two(candidates, |c| c.learning_rate),
        neuron_architecture: top_two(candidates, |c| c.neuron_architecture.clone()),
        batch_size: top_two(candidates, |c| c.batch_size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(learning_rate: f64, batch_size: usize, neuron_architecture: Vec<usize>) -> ModelHyperparameters {
        ModelHyperparameters {
            epoch_count: 100,
            learning_rate,
            neuron_architecture,
            batch_size,
        }
    }

    #[test]
    fn test_top_two_per_hyperparameter() {
        let candidates = vec![
            config(0.01, 64, vec![9]),
            config(0.01, 128, vec![9]),
            config(0.1, 64, vec![9, 9]),
        ];
        let narrowed = narrow(&candidates);

        assert_eq!(narrowed.learning_rate, vec![0.01, 0.1]);
        assert_eq!(narrowed.batch_size, vec![64, 128]);
        assert_eq!(narrowed.neuron_architecture, vec![vec![9], vec![9, 9]]);
        assert_eq!(narrowed.epoch_count, vec![100]);
    }

    #[test]
    fn test_ties_follow_first_seen_order() {
        assert_eq!(most_frequent(&[3, 1, 2, 1, 3, 2], 2), vec![3, 1]);
        assert_eq!(most_frequent(&[5, 7, 7], 2), vec![7, 5]);
    }

    #[test]
    fn test_empty_candidates() {
        let narrowed = narrow(&[]);
        assert!(narrowed.learning_rate.is_empty());
        assert!(narrowed.neuron_architecture.is_empty());
    }
}
