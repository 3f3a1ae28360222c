//! Row index splitting for hold-out validation and k-fold cross-validation

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{RegTuneError, Result};

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Shuffled k-fold split; the first `n_samples % n_splits` folds take one extra row
pub fn k_fold<R: Rng + ?Sized>(n_samples: usize, n_splits: usize, rng: &mut R) -> Result<Vec<CVSplit>> {
    if n_splits < 2 {
        return Err(RegTuneError::Config("n_splits must be at least 2".to_string()));
    }
    if n_samples < n_splits {
        return Err(RegTuneError::Data(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(rng);

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut current = 0;
    for fold_idx in 0..n_splits {
        let fold_size = if fold_idx < remainder { base + 1 } else { base };
        let test_indices = indices[current..current + fold_size].to_vec();
        let train_indices = indices[..current]
            .iter()
            .chain(indices[current + fold_size..].iter())
            .copied()
            .collect();

        splits.push(CVSplit {
            train_indices,
            test_indices,
            fold_idx,
        });
        current += fold_size;
    }

    Ok(splits)
}

/// Shuffled split into (training, validation) row indices. The validation
/// side gets `ceil(n * fraction)` rows.
pub fn train_validation_split<R: Rng + ?Sized>(
    n_samples: usize,
    validation_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&validation_fraction) {
        return Err(RegTuneError::invalid(
            "validation_fraction",
            validation_fraction,
            "must be in [0, 1)",
        ));
    }

    let n_validation = (n_samples as f64 * validation_fraction).ceil() as usize;
    if n_validation >= n_samples {
        return Err(RegTuneError::Data(format!(
            "{} rows leave nothing to train on after holding out {}",
            n_samples, n_validation
        )));
    }

    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(rng);
    let validation = indices.split_off(n_samples - n_validation);
    Ok((indices, validation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_folds_partition_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let splits = k_fold(23, 5, &mut rng).unwrap();

        assert_eq!(splits.len(), 5);
        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 23);
            assert!(split.test_indices.iter().all(|i| !split.train_indices.contains(i)));
        }
        assert_eq!(splits[0].test_indices.len(), 5);
        assert_eq!(splits[4].test_indices.len(), 4);
    }

    #[test]
    fn test_too_few_rows_for_folds() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(k_fold(3, 5, &mut rng).is_err());
        assert!(k_fold(10, 1, &mut rng).is_err());
    }

    #[test]
    fn test_ninety_ten_split() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (train, validation) = train_validation_split(50, 0.1, &mut rng).unwrap();
        assert_eq!(train.len(), 45);
        assert_eq!(validation.len(), 5);
        assert!(validation.iter().all(|i| !train.contains(i)));
    }

    #[test]
    fn test_zero_fraction_keeps_all_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let (train, validation) = train_validation_split(7, 0.0, &mut rng).unwrap();
        assert_eq!(train.len(), 7);
        assert!(validation.is_empty());
    }
}
