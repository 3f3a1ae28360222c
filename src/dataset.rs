//! In-memory tabular input backed by a polars `DataFrame`: named numeric
//! columns, exactly one categorical column and an optional numeric target.
//! Missing cells are nulls; a `NaN` numeric cell is stored as null.

use std::collections::HashSet;

use ndarray::Array1;
use polars::prelude::*;

use crate::error::{RegTuneError, Result};

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    numeric: Vec<String>,
    categorical: String,
    target: Option<String>,
}

impl Dataset {
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Underlying frame; may still hold a target column after `without_target`
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn numeric_names(&self) -> &[String] {
        &self.numeric
    }

    pub fn categorical_name(&self) -> &str {
        &self.categorical
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Values of a numeric feature column, nulls where cells are missing
    pub fn numeric(&self, name: &str) -> Result<&Float64Chunked> {
        if !self.numeric.iter().any(|n| n == name) {
            return Err(RegTuneError::Data(format!("no numeric column '{}'", name)));
        }
        Ok(self.frame.column(name)?.as_materialized_series().f64()?)
    }

    pub fn categorical_labels(&self) -> Result<&StringChunked> {
        Ok(self.frame.column(&self.categorical)?.as_materialized_series().str()?)
    }

    pub fn targets(&self) -> Result<Array1<f64>> {
        let name = self.target.as_deref().ok_or(RegTuneError::MissingTarget)?;
        let values = self.frame.column(name)?.as_materialized_series().f64()?;
        values
            .into_iter()
            .map(|v| v.ok_or_else(|| RegTuneError::Data(format!("target '{}' has a missing value", name))))
            .collect::<Result<Vec<f64>>>()
            .map(Array1::from_vec)
    }

    /// Same rows without the target column, as handed to inference
    pub fn without_target(&self) -> Dataset {
        let frame = match &self.target {
            Some(name) => self.frame.drop(name).unwrap_or_else(|_| self.frame.clone()),
            None => self.frame.clone(),
        };
        Dataset {
            frame,
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
            target: None,
        }
    }

    /// New dataset holding the given rows, in the given order
    pub fn select(&self, rows: &[usize]) -> Result<Dataset> {
        if let Some(&bad) = rows.iter().find(|&&r| r >= self.len()) {
            return Err(RegTuneError::Data(format!(
                "row index {} out of bounds for dataset of {} rows",
                bad,
                self.len()
            )));
        }

        let indices = IdxCa::from_vec("rows".into(), rows.iter().map(|&r| r as IdxSize).collect());
        Ok(Dataset {
            frame: self.frame.take(&indices)?,
            numeric: self.numeric.clone(),
            categorical: self.categorical.clone(),
            target: self.target.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct DatasetBuilder {
    numeric: Vec<(String, Vec<Option<f64>>)>,
    categorical: Vec<(String, Vec<Option<String>>)>,
    target: Option<(String, Vec<f64>)>,
}

impl DatasetBuilder {
    /// Add a numeric feature column with possibly missing cells
    pub fn numeric(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.numeric.push((name.to_string(), values));
        self
    }

    /// Add a fully observed numeric feature column
    pub fn numeric_dense(self, name: &str, values: &[f64]) -> Self {
        self.numeric(name, values.iter().copied().map(Some).collect())
    }

    pub fn categorical(mut self, name: &str, values: Vec<Option<String>>) -> Self {
        self.categorical.push((name.to_string(), values));
        self
    }

    pub fn categorical_dense(self, name: &str, values: &[&str]) -> Self {
        self.categorical(name, values.iter().map(|v| Some(v.to_string())).collect())
    }

    pub fn target(mut self, name: &str, values: &[f64]) -> Self {
        self.target = Some((name.to_string(), values.to_vec()));
        self
    }

    pub fn build(self) -> Result<Dataset> {
        if self.categorical.len() != 1 {
            return Err(RegTuneError::Data(format!(
                "expected exactly one categorical column, got {}",
                self.categorical.len()
            )));
        }
        let (categorical, labels) = self.categorical.into_iter().next().ok_or_else(|| {
            RegTuneError::Data("expected exactly one categorical column".to_string())
        })?;

        let rows = labels.len();
        if rows == 0 {
            return Err(RegTuneError::Data("dataset has no rows".to_string()));
        }

        let mut names = HashSet::new();
        names.insert(categorical.clone());
        let mut columns = Vec::with_capacity(self.numeric.len() + 2);
        let mut numeric = Vec::with_capacity(self.numeric.len());

        for (name, values) in self.numeric {
            if !names.insert(name.clone()) {
                return Err(RegTuneError::Data(format!("duplicate column name '{}'", name)));
            }
            check_rows(&name, "column", values.len(), rows)?;
            if values.iter().flatten().any(|v| v.is_infinite()) {
                return Err(RegTuneError::Data(format!("column '{}' contains infinite values", name)));
            }
            let values: Vec<Option<f64>> = values.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
            columns.push(Column::new(name.as_str().into(), values));
            numeric.push(name);
        }
        columns.push(Column::new(categorical.as_str().into(), labels));

        let target = match self.target {
            Some((name, values)) => {
                if names.contains(&name) {
                    return Err(RegTuneError::Data(format!("duplicate column name '{}'", name)));
                }
                check_rows(&name, "target", values.len(), rows)?;
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(RegTuneError::Data(format!("target '{}' contains non-finite values", name)));
                }
                columns.push(Column::new(name.as_str().into(), values));
                Some(name)
            }
            None => None,
        };

        Ok(Dataset {
            frame: DataFrame::new(columns)?,
            numeric,
            categorical,
            target,
        })
    }
}

fn check_rows(name: &str, kind: &str, actual: usize, rows: usize) -> Result<()> {
    if actual != rows {
        return Err(RegTuneError::Shape {
            expected: format!("{} rows in {} '{}'", rows, kind, name),
            actual: format!("{} rows", actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Dataset {
        Dataset::builder()
            .numeric("rooms", vec![Some(1.0), None, Some(3.0)])
            .categorical_dense("proximity", &["INLAND", "NEAR BAY", "INLAND"])
            .target("value", &[10.0, 20.0, 30.0])
            .build()
            .unwrap()
    }

    #[test]
    fn test_select_reorders_rows() {
        let subset = small().select(&[2, 0]).unwrap();
        assert_eq!(subset.len(), 2);
        let rooms: Vec<Option<f64>> = subset.numeric("rooms").unwrap().into_iter().collect();
        assert_eq!(rooms, vec![Some(3.0), Some(1.0)]);
        assert_eq!(subset.targets().unwrap().to_vec(), vec![30.0, 10.0]);
    }

    #[test]
    fn test_select_out_of_bounds() {
        assert!(small().select(&[3]).is_err());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = Dataset::builder()
            .numeric_dense("a", &[1.0, 2.0])
            .categorical_dense("c", &["x"])
            .build();
        assert!(matches!(result, Err(RegTuneError::Shape { .. })));
    }

    #[test]
    fn test_categorical_required() {
        let result = Dataset::builder().numeric_dense("a", &[1.0]).build();
        assert!(matches!(result, Err(RegTuneError::Data(_))));
    }

    #[test]
    fn test_without_target() {
        let ds = small().without_target();
        assert!(matches!(ds.targets(), Err(RegTuneError::MissingTarget)));
        assert_eq!(ds.frame().width(), 2);
    }

    #[test]
    fn test_nan_cells_are_missing() {
        let ds = Dataset::builder()
            .numeric("latitude", vec![Some(1.0), Some(f64::NAN), Some(3.0)])
            .categorical_dense("proximity", &["INLAND", "INLAND", "INLAND"])
            .build()
            .unwrap();

        let latitude = ds.numeric("latitude").unwrap();
        assert_eq!(latitude.null_count(), 1);
        assert_eq!(latitude.get(1), None);
    }

    #[test]
    fn test_infinite_cells_rejected() {
        let result = Dataset::builder()
            .numeric_dense("latitude", &[1.0, f64::INFINITY])
            .categorical_dense("proximity", &["INLAND", "INLAND"])
            .build();
        assert!(matches!(result, Err(RegTuneError::Data(_))));
    }

    #[test]
    fn test_unknown_numeric_column() {
        assert!(small().numeric("proximity").is_err());
    }
}
