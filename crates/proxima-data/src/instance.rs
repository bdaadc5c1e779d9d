//! A single labeled time-series instance.

use crate::error::DataError;

/// Owned, validated multivariate time series with a class label.
///
/// All dimensions are guaranteed non-empty, equal-length, and all-finite.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSeriesInstance {
    dimensions: Vec<Vec<f64>>,
    label: usize,
}

impl TimeSeriesInstance {
    /// Create a new multivariate instance.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::NoDimensions`] | `dimensions` is empty |
    /// | [`DataError::EmptySeries`] | any dimension has no time steps |
    /// | [`DataError::DimensionLengthMismatch`] | dimensions differ in length |
    /// | [`DataError::NonFiniteValue`] | any value is NaN or infinite |
    pub fn new(dimensions: Vec<Vec<f64>>, label: usize) -> Result<Self, DataError> {
        if dimensions.is_empty() {
            return Err(DataError::NoDimensions);
        }
        let expected = dimensions[0].len();
        for (dimension, series) in dimensions.iter().enumerate() {
            if series.is_empty() {
                return Err(DataError::EmptySeries { dimension });
            }
            if series.len() != expected {
                return Err(DataError::DimensionLengthMismatch {
                    dimension,
                    expected,
                    got: series.len(),
                });
            }
            if let Some(position) = series.iter().position(|v| !v.is_finite()) {
                return Err(DataError::NonFiniteValue {
                    dimension,
                    position,
                });
            }
        }
        Ok(Self { dimensions, label })
    }

    /// Create a univariate instance from a single value series.
    ///
    /// # Errors
    ///
    /// Same conditions as [`TimeSeriesInstance::new`] for a single dimension.
    pub fn univariate(values: Vec<f64>, label: usize) -> Result<Self, DataError> {
        Self::new(vec![values], label)
    }

    /// Create an instance without validation. For internal use where the
    /// values are derived from already-validated data.
    #[doc(hidden)]
    #[must_use]
    pub fn from_validated(dimensions: Vec<Vec<f64>>, label: usize) -> Self {
        Self { dimensions, label }
    }

    /// Return the class-label index.
    #[must_use]
    pub fn label(&self) -> usize {
        self.label
    }

    /// Return the number of dimensions.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        self.dimensions.len()
    }

    /// Return the number of time steps (shared by all dimensions).
    #[must_use]
    pub fn series_len(&self) -> usize {
        self.dimensions[0].len()
    }

    /// Return true if the instance has more than one dimension.
    #[must_use]
    pub fn is_multivariate(&self) -> bool {
        self.dimensions.len() > 1
    }

    /// Return one dimension's value series.
    #[must_use]
    pub fn dim(&self, index: usize) -> &[f64] {
        &self.dimensions[index]
    }

    /// Return all dimensions as borrowed slices.
    #[must_use]
    pub fn dims(&self) -> Vec<&[f64]> {
        self.dimensions.iter().map(Vec::as_slice).collect()
    }

    /// Iterate over the dimension series.
    pub fn iter_dims(&self) -> impl Iterator<Item = &[f64]> {
        self.dimensions.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_no_dimensions() {
        let result = TimeSeriesInstance::new(vec![], 0);
        assert!(matches!(result, Err(DataError::NoDimensions)));
    }

    #[test]
    fn rejects_empty_dimension() {
        let result = TimeSeriesInstance::new(vec![vec![1.0], vec![]], 0);
        assert!(matches!(result, Err(DataError::EmptySeries { dimension: 1 })));
    }

    #[test]
    fn rejects_ragged_dimensions() {
        let result = TimeSeriesInstance::new(vec![vec![1.0, 2.0], vec![3.0]], 0);
        assert!(matches!(
            result,
            Err(DataError::DimensionLengthMismatch {
                dimension: 1,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn rejects_nan() {
        let result = TimeSeriesInstance::univariate(vec![1.0, f64::NAN], 0);
        assert!(matches!(
            result,
            Err(DataError::NonFiniteValue {
                dimension: 0,
                position: 1
            })
        ));
    }

    #[test]
    fn rejects_infinity() {
        let result = TimeSeriesInstance::univariate(vec![f64::INFINITY], 0);
        assert!(matches!(
            result,
            Err(DataError::NonFiniteValue {
                dimension: 0,
                position: 0
            })
        ));
    }

    #[test]
    fn accepts_valid_multivariate() {
        let inst =
            TimeSeriesInstance::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 1).unwrap();
        assert_eq!(inst.n_dims(), 2);
        assert_eq!(inst.series_len(), 2);
        assert_eq!(inst.label(), 1);
        assert!(inst.is_multivariate());
        assert_eq!(inst.dim(1), &[3.0, 4.0]);
    }

    #[test]
    fn univariate_accessors() {
        let inst = TimeSeriesInstance::univariate(vec![5.0, 6.0, 7.0], 2).unwrap();
        assert!(!inst.is_multivariate());
        assert_eq!(inst.series_len(), 3);
        assert_eq!(inst.dims(), vec![&[5.0, 6.0, 7.0][..]]);
    }
}
