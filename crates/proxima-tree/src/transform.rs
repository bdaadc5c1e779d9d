//! Multivariate dimension handling: sampling, conversion, and the
//! derivative transform cache.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use proxima_data::TimeSeriesInstance;
use proxima_distances::derivative_instance;

/// Strategy for choosing which dimensions a split sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DimensionSamplingMode {
    /// Randomly keep a single dimension, discarding the others.
    Single,
    /// Randomly keep between 1 and all dimensions.
    Subset,
    /// Retain all dimensions.
    All,
}

/// Strategy for converting retained dimensions into an alternate form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DimensionConversionMode {
    /// Leave dimensions untouched.
    None,
    /// Concatenate dimensions into one long univariate series.
    Concat,
    /// Interleave dimensions time step by time step into one series.
    Stratify,
    /// Permute dimension order, then concatenate.
    ShuffleConcat,
    /// Permute dimension order, then interleave.
    ShuffleStratify,
    /// Uniformly pick one of the other conversions per split.
    Random,
}

/// How a multivariate distance is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DistanceMode {
    /// The measure sees all retained dimensions at once.
    Dependent,
    /// The measure runs once per dimension and the distances are summed.
    Independent,
    /// Uniformly pick dependent or independent per split.
    Random,
}

/// One step of a fitted transform pipeline.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
enum TransformStep {
    /// Keep the dimensions at these indices, in this order.
    SliceDims(Vec<usize>),
    /// Permute the current dimensions.
    ReorderDims(Vec<usize>),
    /// Concatenate all dimensions end to end.
    ConcatDims,
    /// Interleave all dimensions time step by time step.
    StratifyDims,
}

/// A per-split dimension transform, fitted once with random choices bound
/// and applied as a pure function afterwards (including to query instances
/// at prediction time).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformPipeline {
    steps: Vec<TransformStep>,
}

impl TransformPipeline {
    /// The identity pipeline.
    #[must_use]
    pub fn identity() -> Self {
        Self { steps: Vec::new() }
    }

    /// Return true if the pipeline leaves instances untouched.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fit a pipeline for a split: draw the dimension sample and resolve the
    /// conversion mode. Univariate data always yields the identity.
    pub(crate) fn fit(
        n_dims: usize,
        sampling: DimensionSamplingMode,
        conversion: DimensionConversionMode,
        rng: &mut impl Rng,
    ) -> Self {
        if n_dims <= 1 {
            return Self::identity();
        }

        let mut steps = Vec::new();

        let retained = match sampling {
            DimensionSamplingMode::Single => {
                let dim = rng.gen_range(0..n_dims);
                steps.push(TransformStep::SliceDims(vec![dim]));
                1
            }
            DimensionSamplingMode::Subset => {
                let count = rng.gen_range(1..=n_dims);
                steps.push(TransformStep::SliceDims(choose_indices(n_dims, count, rng)));
                count
            }
            DimensionSamplingMode::All => n_dims,
        };

        let conversion = match conversion {
            DimensionConversionMode::Random => {
                const CHOICES: [DimensionConversionMode; 5] = [
                    DimensionConversionMode::None,
                    DimensionConversionMode::Concat,
                    DimensionConversionMode::Stratify,
                    DimensionConversionMode::ShuffleConcat,
                    DimensionConversionMode::ShuffleStratify,
                ];
                CHOICES[rng.gen_range(0..CHOICES.len())]
            }
            other => other,
        };

        if matches!(
            conversion,
            DimensionConversionMode::ShuffleConcat | DimensionConversionMode::ShuffleStratify
        ) && retained > 1
        {
            steps.push(TransformStep::ReorderDims(choose_indices(
                retained, retained, rng,
            )));
        }

        match conversion {
            DimensionConversionMode::Concat | DimensionConversionMode::ShuffleConcat => {
                steps.push(TransformStep::ConcatDims);
            }
            DimensionConversionMode::Stratify
            | DimensionConversionMode::ShuffleStratify => {
                steps.push(TransformStep::StratifyDims);
            }
            DimensionConversionMode::None | DimensionConversionMode::Random => {}
        }

        Self { steps }
    }

    /// Apply the pipeline to an instance. Pure; the label is preserved.
    #[must_use]
    pub fn transform(&self, inst: &TimeSeriesInstance) -> TimeSeriesInstance {
        if self.is_identity() {
            return inst.clone();
        }
        let mut dims: Vec<Vec<f64>> =
            inst.iter_dims().map(<[f64]>::to_vec).collect();
        for step in &self.steps {
            dims = match step {
                TransformStep::SliceDims(indices) => indices
                    .iter()
                    .filter(|&&d| d < dims.len())
                    .map(|&d| dims[d].clone())
                    .collect(),
                TransformStep::ReorderDims(order) => order
                    .iter()
                    .filter(|&&d| d < dims.len())
                    .map(|&d| dims[d].clone())
                    .collect(),
                TransformStep::ConcatDims => {
                    vec![dims.concat()]
                }
                TransformStep::StratifyDims => {
                    let max_len = dims.iter().map(Vec::len).max().unwrap_or(0);
                    let mut out = Vec::with_capacity(dims.iter().map(Vec::len).sum());
                    for t in 0..max_len {
                        for dim in &dims {
                            if t < dim.len() {
                                out.push(dim[t]);
                            }
                        }
                    }
                    vec![out]
                }
            };
        }
        TimeSeriesInstance::from_validated(dims, inst.label())
    }
}

/// Draw `count` distinct indices from `0..n` via partial Fisher-Yates,
/// in draw order.
fn choose_indices(n: usize, count: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let take = count.min(n);
    for i in 0..take {
        let j = rng.gen_range(i..n);
        order.swap(i, j);
    }
    order.truncate(take);
    order
}

/// Cache of derivative transforms keyed by training-instance index.
///
/// Derivatives are pure functions of the raw instance, so entries stay valid
/// across splits; the cache is only consulted when a split's pipeline is the
/// identity (otherwise the derivative of the transformed series differs).
/// Populated and read from the single build thread, so no locking.
#[derive(Debug, Default)]
pub(crate) struct TransformCache {
    derivatives: HashMap<usize, Arc<TimeSeriesInstance>>,
}

impl TransformCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The derivative of training instance `train_index`, computed on first
    /// request.
    pub(crate) fn derivative(
        &mut self,
        train_index: usize,
        inst: &TimeSeriesInstance,
    ) -> Arc<TimeSeriesInstance> {
        Arc::clone(
            self.derivatives
                .entry(train_index)
                .or_insert_with(|| Arc::new(derivative_instance(inst))),
        )
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.derivatives.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn multivariate() -> TimeSeriesInstance {
        TimeSeriesInstance::new(
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]],
            1,
        )
        .unwrap()
    }

    #[test]
    fn univariate_data_yields_identity() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pipeline = TransformPipeline::fit(
            1,
            DimensionSamplingMode::Single,
            DimensionConversionMode::Concat,
            &mut rng,
        );
        assert!(pipeline.is_identity());
    }

    #[test]
    fn single_sampling_keeps_one_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pipeline = TransformPipeline::fit(
            3,
            DimensionSamplingMode::Single,
            DimensionConversionMode::None,
            &mut rng,
        );
        let out = pipeline.transform(&multivariate());
        assert_eq!(out.n_dims(), 1);
        assert_eq!(out.series_len(), 3);
        assert_eq!(out.label(), 1);
    }

    #[test]
    fn subset_sampling_keeps_between_one_and_all() {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let pipeline = TransformPipeline::fit(
                3,
                DimensionSamplingMode::Subset,
                DimensionConversionMode::None,
                &mut rng,
            );
            let out = pipeline.transform(&multivariate());
            assert!((1..=3).contains(&out.n_dims()));
        }
    }

    #[test]
    fn concat_produces_one_long_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pipeline = TransformPipeline::fit(
            3,
            DimensionSamplingMode::All,
            DimensionConversionMode::Concat,
            &mut rng,
        );
        let out = pipeline.transform(&multivariate());
        assert_eq!(out.n_dims(), 1);
        assert_eq!(
            out.dim(0),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn stratify_interleaves_time_steps() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pipeline = TransformPipeline::fit(
            3,
            DimensionSamplingMode::All,
            DimensionConversionMode::Stratify,
            &mut rng,
        );
        let out = pipeline.transform(&multivariate());
        assert_eq!(out.n_dims(), 1);
        assert_eq!(
            out.dim(0),
            &[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]
        );
    }

    #[test]
    fn shuffle_concat_is_a_permuted_concat() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let pipeline = TransformPipeline::fit(
            3,
            DimensionSamplingMode::All,
            DimensionConversionMode::ShuffleConcat,
            &mut rng,
        );
        let out = pipeline.transform(&multivariate());
        assert_eq!(out.n_dims(), 1);
        assert_eq!(out.series_len(), 9);
        let mut values = out.dim(0).to_vec();
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn random_conversion_resolves_to_concrete_mode() {
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let pipeline = TransformPipeline::fit(
                3,
                DimensionSamplingMode::All,
                DimensionConversionMode::Random,
                &mut rng,
            );
            // Applying the fitted pipeline twice gives the same result.
            let once = pipeline.transform(&multivariate());
            let twice = pipeline.transform(&multivariate());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn cache_computes_once_per_index() {
        let inst = multivariate();
        let mut cache = TransformCache::new();
        let first = cache.derivative(4, &inst);
        let second = cache.derivative(4, &inst);
        assert_eq!(cache.len(), 1);
        assert_eq!(*first, *second);
    }

    #[test]
    fn choose_indices_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let picked = choose_indices(5, 5, &mut rng);
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }
}
