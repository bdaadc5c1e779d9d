//! The per-node unit of work: partition data by proximity to exemplars.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use proxima_data::{TimeSeriesInstance, TimeSeriesInstances};
use proxima_distances::DistanceMeasure;

use crate::error::ProximityError;
use crate::params::{DataStats, DistanceSpace};
use crate::scorer::SplitScorer;
use crate::transform::{
    DimensionConversionMode, DimensionSamplingMode, DistanceMode, TransformCache,
    TransformPipeline,
};

/// One partition's representative instance: its series in pipeline space
/// (frozen for prediction), its position within the node data, and its label.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Exemplar {
    series: TimeSeriesInstance,
    position: usize,
    label: usize,
}

/// Everything a split build needs from the classifier configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SplitContext<'a> {
    pub(crate) data: &'a TimeSeriesInstances,
    pub(crate) spaces: &'a [DistanceSpace],
    pub(crate) scorer: SplitScorer,
    pub(crate) sampling: DimensionSamplingMode,
    pub(crate) conversion: DimensionConversionMode,
    pub(crate) distance_mode: DistanceMode,
    pub(crate) early_abandon: bool,
    pub(crate) early_exemplar_check: bool,
    pub(crate) partition_reordering: bool,
}

/// The split payload of one tree node.
///
/// Unbuilt splits carry only their data-index list and class distribution;
/// [`Split::build`] draws a distance configuration, picks one exemplar per
/// represented class, and routes every instance in the node to the partition
/// of its nearest exemplar. After building, every data index appears in
/// exactly one partition and the split is frozen for prediction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Split {
    data_indices: Vec<usize>,
    n_classes: usize,
    distribution: Vec<f64>,
    pipeline: TransformPipeline,
    measure: Option<DistanceMeasure>,
    exemplars: Vec<Exemplar>,
    partitions: Vec<Vec<usize>>,
    score: Option<f64>,
}

impl Split {
    /// Create an unbuilt split over the given training-set indices.
    pub(crate) fn new(data_indices: Vec<usize>, data: &TimeSeriesInstances) -> Self {
        let n_classes = data.n_classes();
        let mut counts = vec![0usize; n_classes];
        for &idx in &data_indices {
            counts[data.get(idx).label()] += 1;
        }
        let total = data_indices.len() as f64;
        let distribution = counts.iter().map(|&c| c as f64 / total).collect();
        Self {
            data_indices,
            n_classes,
            distribution,
            pipeline: TransformPipeline::identity(),
            measure: None,
            exemplars: Vec::new(),
            partitions: Vec::new(),
            score: None,
        }
    }

    /// The training-set indices of the data at this node.
    #[must_use]
    pub fn data_indices(&self) -> &[usize] {
        &self.data_indices
    }

    /// Number of instances at this node.
    #[must_use]
    pub fn n_instances(&self) -> usize {
        self.data_indices.len()
    }

    /// The class distribution of the data at this node. Sums to 1; one-hot
    /// when the node is pure.
    #[must_use]
    pub fn distribution(&self) -> &[f64] {
        &self.distribution
    }

    /// True if at most one class is represented at this node.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.distribution.iter().filter(|&&p| p > 0.0).count() <= 1
    }

    /// The cached split score; `None` until built.
    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// True once [`Split::build`] has completed.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.measure.is_some()
    }

    /// The fitted distance measure; `None` until built.
    #[must_use]
    pub fn measure(&self) -> Option<&DistanceMeasure> {
        self.measure.as_ref()
    }

    /// The fitted transform pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &TransformPipeline {
        &self.pipeline
    }

    /// Number of realized partitions (one per represented class).
    #[must_use]
    pub fn n_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// The training-set indices routed to partition `partition`.
    #[must_use]
    pub fn partition_train_indices(&self, partition: usize) -> Vec<usize> {
        self.partitions[partition]
            .iter()
            .map(|&pos| self.data_indices[pos])
            .collect()
    }

    /// Partition the node's data.
    ///
    /// Progression: fit the transform pipeline, draw and fit a distance
    /// configuration, pick one exemplar per represented class, then assign
    /// every instance (in index order) to its nearest exemplar's partition,
    /// breaking exact ties uniformly at random. The score is computed once
    /// over the realized partitions and cached.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::NonFiniteScore`] if the configured scorer
    /// produces NaN or infinity.
    pub(crate) fn build(
        &mut self,
        ctx: &SplitContext<'_>,
        rng: &mut ChaCha8Rng,
        mut cache: Option<&mut TransformCache>,
    ) -> Result<(), ProximityError> {
        let n = self.data_indices.len();

        // Transform: bind the per-split dimension sampling and conversion.
        let n_dims = self
            .data_indices
            .iter()
            .map(|&idx| ctx.data.get(idx).n_dims())
            .max()
            .unwrap_or(1);
        self.pipeline =
            TransformPipeline::fit(n_dims, ctx.sampling, ctx.conversion, rng);
        let transformed: Vec<Cow<'_, TimeSeriesInstance>> = self
            .data_indices
            .iter()
            .map(|&idx| {
                let inst = ctx.data.get(idx);
                if self.pipeline.is_identity() {
                    Cow::Borrowed(inst)
                } else {
                    Cow::Owned(self.pipeline.transform(inst))
                }
            })
            .collect();

        // Distance measure: one uniformly drawn space builder, one sampled
        // assignment, then multivariate wrapping and fitting.
        let stats = DataStats::compute(transformed.iter().map(|c| &**c));
        let space_builder = ctx.spaces[rng.gen_range(0..ctx.spaces.len())];
        let mut measure = space_builder.build(&stats).sample(rng);

        if transformed.iter().any(|t| t.is_multivariate()) {
            let mode = match ctx.distance_mode {
                DistanceMode::Random => {
                    if rng.gen_range(0..2) == 0 {
                        DistanceMode::Dependent
                    } else {
                        DistanceMode::Independent
                    }
                }
                mode => mode,
            };
            if mode == DistanceMode::Independent {
                measure = DistanceMeasure::Independent(Box::new(measure));
            }
        }
        measure.fit(stats.max_series_len);

        // Derivative cache: when the pipeline is the identity and the measure
        // derives at its root, probe with pre-derived data and the inner
        // measure. The outcome is identical to calling the wrapper directly.
        let use_cache = cache.is_some()
            && self.pipeline.is_identity()
            && matches!(measure, DistanceMeasure::Derivative(_));
        let derived: Option<Vec<Arc<TimeSeriesInstance>>> = if use_cache {
            cache.as_mut().map(|cache| {
                self.data_indices
                    .iter()
                    .map(|&idx| cache.derivative(idx, ctx.data.get(idx)))
                    .collect()
            })
        } else {
            None
        };
        let probe_measure = if use_cache {
            measure.strip_derivative()
        } else {
            measure.clone()
        };
        let probe_views: Vec<&TimeSeriesInstance> = match &derived {
            Some(d) => d.iter().map(Arc::as_ref).collect(),
            None => transformed.iter().map(|c| &**c).collect(),
        };

        // Exemplars: one uniform draw per represented class, in class order.
        let mut positions_by_class: Vec<Vec<usize>> = vec![Vec::new(); self.n_classes];
        for (pos, &idx) in self.data_indices.iter().enumerate() {
            positions_by_class[ctx.data.get(idx).label()].push(pos);
        }
        self.exemplars.clear();
        self.partitions.clear();
        for (label, class_positions) in positions_by_class.iter().enumerate() {
            if class_positions.is_empty() {
                continue;
            }
            let position = class_positions[rng.gen_range(0..class_positions.len())];
            self.exemplars.push(Exemplar {
                series: transformed[position].clone().into_owned(),
                position,
                label,
            });
            self.partitions.push(Vec::new());
        }

        // Exemplar position -> partition lookup for the early check.
        let exemplar_partitions: Option<HashMap<usize, usize>> =
            ctx.early_exemplar_check.then(|| {
                self.exemplars
                    .iter()
                    .enumerate()
                    .map(|(partition, ex)| (ex.position, partition))
                    .collect()
            });

        // Probe orders: static, or per class in descending partition size.
        let static_order: Vec<(usize, usize)> =
            (0..self.partitions.len()).map(|p| (p, 0)).collect();
        let mut order_by_class: Option<Vec<Vec<(usize, usize)>>> = ctx
            .partition_reordering
            .then(|| vec![static_order.clone(); self.n_classes]);

        for pos in 0..n {
            // An instance that is itself an exemplar belongs to its own
            // partition; no distance computation needed.
            if let Some(map) = &exemplar_partitions
                && let Some(&partition) = map.get(&pos)
            {
                self.partitions[partition].push(pos);
                continue;
            }

            let label = ctx.data.get(self.data_indices[pos]).label();
            match &mut order_by_class {
                Some(orders) => {
                    let order = &mut orders[label];
                    let mut k = probe_nearest(
                        &probe_measure,
                        probe_views[pos],
                        Some(pos),
                        &self.exemplars,
                        Some(&probe_views),
                        order,
                        ctx.early_abandon,
                        ctx.early_exemplar_check,
                        rng,
                    );
                    let partition = order[k].0;
                    self.partitions[partition].push(pos);
                    // Restore descending order with an insertion bubble.
                    order[k].1 += 1;
                    while k > 0 && order[k - 1].1 < order[k].1 {
                        order.swap(k - 1, k);
                        k -= 1;
                    }
                }
                None => {
                    let k = probe_nearest(
                        &probe_measure,
                        probe_views[pos],
                        Some(pos),
                        &self.exemplars,
                        Some(&probe_views),
                        &static_order,
                        ctx.early_abandon,
                        ctx.early_exemplar_check,
                        rng,
                    );
                    self.partitions[k].push(pos);
                }
            }
        }

        // Score once over the realized partitions, then cache.
        let mut parent_counts = vec![0usize; self.n_classes];
        for &idx in &self.data_indices {
            parent_counts[ctx.data.get(idx).label()] += 1;
        }
        let child_counts: Vec<Vec<usize>> = self
            .partitions
            .iter()
            .map(|partition| {
                let mut counts = vec![0usize; self.n_classes];
                for &pos in partition {
                    counts[ctx.data.get(self.data_indices[pos]).label()] += 1;
                }
                counts
            })
            .collect();
        let score = ctx.scorer.score(&parent_counts, &child_counts);
        if !score.is_finite() {
            return Err(ProximityError::NonFiniteScore { score });
        }
        self.score = Some(score);
        self.measure = Some(measure);
        Ok(())
    }

    /// Route a query instance to its nearest exemplar's partition, using the
    /// stored pipeline and measure frozen at build time.
    ///
    /// Returns `None` when the split was never built (the node then acts as
    /// a leaf).
    pub(crate) fn partition_for_query(
        &self,
        inst: &TimeSeriesInstance,
        early_abandon: bool,
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let measure = self.measure.as_ref()?;
        let transformed = self.pipeline.transform(inst);
        let order: Vec<(usize, usize)> =
            (0..self.partitions.len()).map(|p| (p, 0)).collect();
        let k = probe_nearest(
            measure,
            &transformed,
            None,
            &self.exemplars,
            None,
            &order,
            early_abandon,
            false,
            rng,
        );
        Some(k)
    }
}

/// Find the nearest exemplar for `query`, probing partitions in the given
/// order. Returns the index *into the order slice* of the chosen partition.
///
/// `query_position` is the query's position within the node data at build
/// time (`None` for unseen instances at prediction time). `views` resolves
/// exemplar series by position during building; when absent the stored
/// pipeline-space series are used.
///
/// With early abandon, each subsequent distance is computed with the current
/// best as its cutoff; the cutoff comparison inside the kernels is strict,
/// so exact ties still surface and are broken uniformly at random.
#[allow(clippy::too_many_arguments)]
fn probe_nearest(
    measure: &DistanceMeasure,
    query: &TimeSeriesInstance,
    query_position: Option<usize>,
    exemplars: &[Exemplar],
    views: Option<&[&TimeSeriesInstance]>,
    order: &[(usize, usize)],
    early_abandon: bool,
    early_exemplar_check: bool,
    rng: &mut ChaCha8Rng,
) -> usize {
    let mut best = f64::INFINITY;
    let mut tied: Vec<usize> = Vec::new();
    let mut limit = f64::INFINITY;

    for (k, &(partition, _)) in order.iter().enumerate() {
        let exemplar = &exemplars[partition];
        // Without the up-front exemplar map, an instance meeting its own
        // exemplar mid-probe short-circuits there.
        if !early_exemplar_check && query_position == Some(exemplar.position) {
            return k;
        }
        let exemplar_series = match views {
            Some(views) => views[exemplar.position],
            None => &exemplar.series,
        };
        let cutoff = if early_abandon { limit } else { f64::INFINITY };
        let distance = measure.distance(exemplar_series, query, cutoff);
        if distance < best {
            best = distance;
            limit = distance;
            tied.clear();
            tied.push(k);
        } else if distance == best {
            tied.push(k);
        }
    }

    tied[rng.gen_range(0..tied.len())]
}
