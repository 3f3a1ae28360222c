//! One-hot encoding of the categorical column over a fixed vocabulary

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RegTuneError, Result};

/// What to do with a label that is not in the fitted vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Encode as an all-zero row
    #[default]
    AllZeros,
    /// Fail the transform
    Reject,
}

/// Ordered, duplicate-free set of category labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    labels: Vec<String>,
}

impl CategoryVocabulary {
    /// Keeps the first occurrence of each label, in the given order
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !unique.iter().any(|l| l == label.as_ref()) {
                unique.push(label.as_ref().to_string());
            }
        }
        CategoryVocabulary { labels: unique }
    }

    /// Sorted set of the observed labels
    pub fn learn(observed: &[String]) -> Self {
        let mut labels = observed.to_vec();
        labels.sort();
        labels.dedup();
        CategoryVocabulary { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn encode(&self, column: &str, values: &[String], policy: UnknownCategoryPolicy) -> Result<Array2<f64>> {
        let mut encoded = Array2::zeros((values.len(), self.len()));
        let mut unseen = 0usize;

        for (row, label) in values.iter().enumerate() {
            match self.index_of(label) {
                Some(idx) => encoded[[row, idx]] = 1.0,
                None => match policy {
                    UnknownCategoryPolicy::AllZeros => unseen += 1,
                    UnknownCategoryPolicy::Reject => {
                        return Err(RegTuneError::UnknownCategory {
                            column: column.to_string(),
                            label: label.clone(),
                        })
                    }
                },
            }
        }

        if unseen > 0 {
            warn!(column, unseen, "labels outside the fitted vocabulary encoded as zeros");
        }
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_duplicate_labels_collapse() {
        let vocab = CategoryVocabulary::from_labels(&["<1H OCEAN", "INLAND", "NEAR OCEAN", "NEAR BAY", "NEAR OCEAN"]);
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.index_of("NEAR BAY"), Some(3));
    }

    #[test]
    fn test_learned_vocabulary_is_sorted() {
        let vocab = CategoryVocabulary::learn(&["b".into(), "a".into(), "b".into()]);
        assert_eq!(vocab.labels(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_encode_and_unknown_policies() {
        let vocab = CategoryVocabulary::from_labels(&["x", "y"]);
        let values = vec!["y".to_string(), "z".to_string()];

        let encoded = vocab.encode("c", &values, UnknownCategoryPolicy::AllZeros).unwrap();
        assert_eq!(encoded, array![[0.0, 1.0], [0.0, 0.0]]);

        let rejected = vocab.encode("c", &values, UnknownCategoryPolicy::Reject);
        assert!(matches!(rejected, Err(RegTuneError::UnknownCategory { ref label, .. }) if label == "z"));
    }
}
