//! Missing value imputation

use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{RegTuneError, Result};

/// Strategy for imputing missing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Column mean (numeric only)
    Mean,
    /// Column median (numeric only)
    Median,
    /// Most frequent label (categorical)
    MostFrequent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFill {
    pub column: String,
    pub strategy: ImputeStrategy,
    pub value: f64,
}

/// Fill values computed on the fitting rows and reused for every later transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationState {
    pub numeric: Vec<NumericFill>,
    pub categorical: Option<String>,
}

impl ImputationState {
    pub fn fit(dataset: &Dataset, mean_columns: &[String]) -> Result<Self> {
        let numeric = dataset
            .numeric_names()
            .iter()
            .map(|name| {
                let strategy = if mean_columns.iter().any(|m| m == name) {
                    ImputeStrategy::Mean
                } else {
                    ImputeStrategy::Median
                };
                let value = compute_fill_value(dataset.numeric(name)?, strategy);
                Ok(NumericFill { column: name.clone(), strategy, value })
            })
            .collect::<Result<Vec<_>>>()?;

        let labels: Vec<&str> = dataset.categorical_labels()?.into_iter().flatten().collect();

        Ok(ImputationState {
            numeric,
            categorical: mode(&labels).map(str::to_string),
        })
    }

    /// Numeric columns with missing cells filled, rows × columns in dataset order
    pub fn fill_numeric(&self, dataset: &Dataset) -> Result<Array2<f64>> {
        let names = dataset.numeric_names();
        let fitted: Vec<&str> = self.numeric.iter().map(|f| f.column.as_str()).collect();
        if names.iter().map(String::as_str).ne(fitted.iter().copied()) {
            return Err(RegTuneError::Shape {
                expected: format!("numeric columns {:?}", fitted),
                actual: format!("{:?}", names),
            });
        }

        let mut filled = Array2::zeros((dataset.len(), names.len()));
        for (mut column, fill) in filled.columns_mut().into_iter().zip(&self.numeric) {
            let values = dataset.numeric(&fill.column)?;
            for (cell, value) in column.iter_mut().zip(values) {
                *cell = value.unwrap_or(fill.value);
            }
        }
        Ok(filled)
    }

    /// Categorical labels with missing cells filled by the fitted mode
    pub fn fill_categorical(&self, dataset: &Dataset) -> Result<Vec<String>> {
        dataset
            .categorical_labels()?
            .into_iter()
            .map(|v| match (v, &self.categorical) {
                (Some(label), _) => Ok(label.to_string()),
                (None, Some(fill)) => Ok(fill.clone()),
                (None, None) => Err(RegTuneError::Preprocessing(format!(
                    "column '{}' has a missing label and no fitted mode",
                    dataset.categorical_name()
                ))),
            })
            .collect()
    }
}

/// Mean or median over the observed cells; `0.0` when nothing was observed
fn compute_fill_value(values: &Float64Chunked, strategy: ImputeStrategy) -> f64 {
    match strategy {
        ImputeStrategy::Mean => values.mean(),
        _ => values.median(),
    }
    .unwrap_or(0.0)
}

/// Most frequent label; ties go to the lexicographically smallest
fn mode<'a>(labels: &[&'a str]) -> Option<&'a str> {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();

    let mut best: Option<(&str, usize)> = None;
    for group in sorted.chunk_by(|a, b| a == b) {
        if best.map_or(true, |(_, count)| group.len() > count) {
            best = Some((group[0], group.len()));
        }
    }
    best.map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        let odd = Float64Chunked::new("a".into(), &[Some(3.0), None, Some(1.0), Some(2.0)]);
        let even = Float64Chunked::new("b".into(), &[4.0, 1.0, 3.0, 2.0]);
        let empty = Float64Chunked::new("c".into(), &[None::<f64>, None]);

        assert_eq!(compute_fill_value(&odd, ImputeStrategy::Median), 2.0);
        assert_eq!(compute_fill_value(&even, ImputeStrategy::Median), 2.5);
        assert_eq!(compute_fill_value(&empty, ImputeStrategy::Mean), 0.0);
    }

    #[test]
    fn test_mode_tie_break() {
        assert_eq!(mode(&["b", "a", "b", "a"]), Some("a"));
        assert_eq!(mode(&["c", "b", "c"]), Some("c"));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn test_fill_uses_column_policy() {
        let ds = Dataset::builder()
            .numeric("latitude", vec![Some(1.0), Some(2.0), Some(6.0), None])
            .numeric("rooms", vec![Some(1.0), Some(2.0), Some(6.0), None])
            .categorical("proximity", vec![Some("INLAND".into()), None, Some("INLAND".into()), Some("ISLAND".into())])
            .build()
            .unwrap();

        let state = ImputationState::fit(&ds, &["latitude".to_string()]).unwrap();
        let filled = state.fill_numeric(&ds).unwrap();

        assert_eq!(filled[[3, 0]], 3.0);
        assert_eq!(filled[[3, 1]], 2.0);
        assert_eq!(state.fill_categorical(&ds).unwrap()[1], "INLAND");
    }

    #[test]
    fn test_nan_cell_takes_fill_value() {
        let ds = Dataset::builder()
            .numeric("latitude", vec![Some(1.0), Some(f64::NAN), Some(3.0)])
            .categorical_dense("proximity", &["INLAND", "INLAND", "INLAND"])
            .build()
            .unwrap();

        let state = ImputationState::fit(&ds, &["latitude".to_string()]).unwrap();
        let filled = state.fill_numeric(&ds).unwrap();

        assert_eq!(state.numeric[0].value, 2.0);
        assert_eq!(filled.column(0).to_vec(), vec![1.0, 2.0, 3.0]);
    }
}
