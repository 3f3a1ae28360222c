//! Min-max feature scaling

use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{RegTuneError, Result};

/// Per-column min/max fitted once on training rows. There are no mutating
/// methods: a new state can only come from `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingState {
    min: Array1<f64>,
    max: Array1<f64>,
}

impl ScalingState {
    pub fn fit(data: &Array2<f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(RegTuneError::Preprocessing("cannot fit scaling on zero rows".to_string()));
        }
        let min = data.fold_axis(Axis(0), f64::INFINITY, |acc, &x| acc.min(x));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &x| acc.max(x));
        Ok(ScalingState { min, max })
    }

    pub fn min(&self) -> &Array1<f64> {
        &self.min
    }

    pub fn max(&self) -> &Array1<f64> {
        &self.max
    }

    pub fn range(&self) -> Array1<f64> {
        &self.max - &self.min
    }

    pub fn width(&self) -> usize {
        self.min.len()
    }

    /// `(x - min) / (max - min)` without clamping; constant columns map to 0
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.width() {
            return Err(RegTuneError::Shape {
                expected: format!("{} columns", self.width()),
                actual: format!("{} columns", data.ncols()),
            });
        }

        let range = self.range();
        let mut scaled = data.clone();
        for mut row in scaled.rows_mut() {
            Zip::from(&mut row)
                .and(&self.min)
                .and(&range)
                .for_each(|x, &min, &range| {
                    *x = if range == 0.0 { 0.0 } else { (*x - min) / range };
                });
        }
        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_records_column_extremes() {
        let state = ScalingState::fit(&array![[1.0, -2.0], [3.0, 4.0], [2.0, 0.0]]).unwrap();
        assert_eq!(state.min(), &array![1.0, -2.0]);
        assert_eq!(state.max(), &array![3.0, 4.0]);
        assert_eq!(state.range(), array![2.0, 6.0]);
    }

    #[test]
    fn test_values_outside_range_pass_through() {
        let state = ScalingState::fit(&array![[0.0], [10.0]]).unwrap();
        let scaled = state.transform(&array![[20.0], [-5.0]]).unwrap();
        assert_eq!(scaled, array![[2.0], [-0.5]]);
    }

    #[test]
    fn test_constant_column_is_zero() {
        let data = array![[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]];
        let state = ScalingState::fit(&data).unwrap();
        let scaled = state.transform(&data).unwrap();
        assert!(scaled.column(0).iter().all(|&x| x == 0.0));
        assert!(scaled.iter().all(|x| !x.is_nan()));
    }
}
