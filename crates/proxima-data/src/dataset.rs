//! An ordered collection of labeled time-series instances.

use crate::error::DataError;
use crate::instance::TimeSeriesInstance;

/// Owned, validated labeled dataset.
///
/// Instances keep their insertion order; subsets are expressed elsewhere as
/// index lists into this collection rather than copies.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimeSeriesInstances {
    instances: Vec<TimeSeriesInstance>,
    n_classes: usize,
}

impl TimeSeriesInstances {
    /// Create a new dataset over `n_classes` class labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::EmptyDataset`] | `instances` is empty |
    /// | [`DataError::ZeroClasses`] | `n_classes` is zero |
    /// | [`DataError::LabelOutOfRange`] | any label is `>= n_classes` |
    pub fn new(
        instances: Vec<TimeSeriesInstance>,
        n_classes: usize,
    ) -> Result<Self, DataError> {
        if instances.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if n_classes == 0 {
            return Err(DataError::ZeroClasses);
        }
        for (instance, inst) in instances.iter().enumerate() {
            if inst.label() >= n_classes {
                return Err(DataError::LabelOutOfRange {
                    instance,
                    label: inst.label(),
                    n_classes,
                });
            }
        }
        Ok(Self {
            instances,
            n_classes,
        })
    }

    /// Return the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Return true if the dataset has no instances.
    ///
    /// A dataset constructed via [`TimeSeriesInstances::new`] is always
    /// non-empty, so this always returns `false` for valid instances.
    /// Provided to satisfy the `len_without_is_empty` convention.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Return the declared number of class labels.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return one instance.
    #[must_use]
    pub fn get(&self, index: usize) -> &TimeSeriesInstance {
        &self.instances[index]
    }

    /// Iterate over the instances in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesInstance> {
        self.instances.iter()
    }

    /// Return true if any instance has more than one dimension.
    #[must_use]
    pub fn is_multivariate(&self) -> bool {
        self.instances.iter().any(TimeSeriesInstance::is_multivariate)
    }

    /// Return the largest dimension count across instances.
    #[must_use]
    pub fn max_n_dims(&self) -> usize {
        self.instances
            .iter()
            .map(TimeSeriesInstance::n_dims)
            .max()
            .unwrap_or(0)
    }

    /// Return the longest series length across instances.
    #[must_use]
    pub fn max_series_len(&self) -> usize {
        self.instances
            .iter()
            .map(TimeSeriesInstance::series_len)
            .max()
            .unwrap_or(0)
    }

    /// Group instance indices by class label.
    ///
    /// The returned list has one entry per class label in `0..n_classes`;
    /// classes with no instances get an empty list. Within a class the
    /// indices keep dataset order.
    #[must_use]
    pub fn indices_by_class(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.n_classes];
        for (index, inst) in self.instances.iter().enumerate() {
            groups[inst.label()].push(index);
        }
        groups
    }

    /// Population standard deviation pooled over every value in the dataset.
    ///
    /// Parameter spaces for some elastic distances scale their ranges by
    /// this statistic. Returns 0.0 for a constant-valued dataset.
    #[must_use]
    pub fn pooled_std(&self) -> f64 {
        let mut count = 0usize;
        let mut mean = 0.0f64;
        // Welford's online mean/variance over all values in all dimensions.
        let mut m2 = 0.0f64;
        for inst in &self.instances {
            for dim in inst.iter_dims() {
                for &v in dim {
                    count += 1;
                    let delta = v - mean;
                    mean += delta / count as f64;
                    m2 += delta * (v - mean);
                }
            }
        }
        if count == 0 {
            return 0.0;
        }
        (m2 / count as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dataset() -> TimeSeriesInstances {
        TimeSeriesInstances::new(
            vec![
                TimeSeriesInstance::univariate(vec![0.0, 0.0], 0).unwrap(),
                TimeSeriesInstance::univariate(vec![1.0, 1.0], 1).unwrap(),
                TimeSeriesInstance::univariate(vec![2.0, 2.0], 0).unwrap(),
            ],
            2,
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty() {
        let result = TimeSeriesInstances::new(vec![], 2);
        assert!(matches!(result, Err(DataError::EmptyDataset)));
    }

    #[test]
    fn rejects_zero_classes() {
        let inst = TimeSeriesInstance::univariate(vec![1.0], 0).unwrap();
        let result = TimeSeriesInstances::new(vec![inst], 0);
        assert!(matches!(result, Err(DataError::ZeroClasses)));
    }

    #[test]
    fn rejects_label_out_of_range() {
        let inst = TimeSeriesInstance::univariate(vec![1.0], 3).unwrap();
        let result = TimeSeriesInstances::new(vec![inst], 2);
        assert!(matches!(
            result,
            Err(DataError::LabelOutOfRange {
                instance: 0,
                label: 3,
                n_classes: 2
            })
        ));
    }

    #[test]
    fn indices_grouped_by_class() {
        let data = make_dataset();
        let groups = data.indices_by_class();
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn empty_class_gets_empty_group() {
        let inst = TimeSeriesInstance::univariate(vec![1.0], 0).unwrap();
        let data = TimeSeriesInstances::new(vec![inst], 3).unwrap();
        assert_eq!(data.indices_by_class(), vec![vec![0], vec![], vec![]]);
    }

    #[test]
    fn summary_statistics() {
        let data = make_dataset();
        assert_eq!(data.len(), 3);
        assert_eq!(data.max_series_len(), 2);
        assert_eq!(data.max_n_dims(), 1);
        assert!(!data.is_multivariate());
        // values: 0,0,1,1,2,2 -> mean 1, variance 2/3
        assert!((data.pooled_std() - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn pooled_std_constant_dataset() {
        let data = TimeSeriesInstances::new(
            vec![TimeSeriesInstance::univariate(vec![5.0, 5.0, 5.0], 0).unwrap()],
            1,
        )
        .unwrap();
        assert_eq!(data.pooled_std(), 0.0);
    }
}
