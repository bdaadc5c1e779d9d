//! The proximity-tree classifier: contracted building, best-of-R split
//! search, checkpoint/resume, and prediction traversal.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use proxima_data::{TimeSeriesInstance, TimeSeriesInstances};

use crate::checkpoint::{self, CheckpointEnvelope};
use crate::error::ProximityError;
use crate::params::DistanceSpace;
use crate::scorer::SplitScorer;
use crate::split::{Split, SplitContext};
use crate::transform::{
    DimensionConversionMode, DimensionSamplingMode, DistanceMode, TransformCache,
};
use crate::tree::{NodeId, Tree};

/// Configuration for a proximity tree.
///
/// Construct via [`ProximityTreeConfig::new`] (or the [`r5`][Self::r5] /
/// [`r10`][Self::r10] presets), then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                | Default                       |
/// |--------------------------|-------------------------------|
/// | `spaces`                 | the full eleven-space suite   |
/// | `scorer`                 | `GiniGain`                    |
/// | `r`                      | 1                             |
/// | `breadth_first`          | `false` (depth-first)         |
/// | `dimension_sampling`     | `Single`                      |
/// | `dimension_conversion`   | `None`                        |
/// | `distance_mode`          | `Dependent`                   |
/// | `early_abandon_distances`| `false`                       |
/// | `early_exemplar_check`   | `false`                       |
/// | `partition_reordering`   | `false`                       |
/// | `cache_transforms`       | `false`                       |
/// | `train_time_limit`       | `None` (unlimited)            |
/// | `test_time_limit`        | `None` (unlimited)            |
/// | `checkpoint_dir`         | `None` (disabled)             |
/// | `checkpoint_interval`    | 1 hour                        |
/// | `seed`                   | 0                             |
#[derive(Debug, Clone)]
pub struct ProximityTreeConfig {
    pub(crate) spaces: Vec<DistanceSpace>,
    pub(crate) scorer: SplitScorer,
    pub(crate) r: usize,
    pub(crate) breadth_first: bool,
    pub(crate) dimension_sampling: DimensionSamplingMode,
    pub(crate) dimension_conversion: DimensionConversionMode,
    pub(crate) distance_mode: DistanceMode,
    pub(crate) early_abandon_distances: bool,
    pub(crate) early_exemplar_check: bool,
    pub(crate) partition_reordering: bool,
    pub(crate) cache_transforms: bool,
    pub(crate) train_time_limit: Option<Duration>,
    pub(crate) test_time_limit: Option<Duration>,
    pub(crate) checkpoint_dir: Option<PathBuf>,
    pub(crate) checkpoint_interval: Duration,
    pub(crate) seed: u64,
}

impl ProximityTreeConfig {
    /// Create a config with default values (a single split attempt per
    /// node, see the struct-level table).
    #[must_use]
    pub fn new() -> Self {
        Self {
            spaces: DistanceSpace::full_suite(),
            scorer: SplitScorer::GiniGain,
            r: 1,
            breadth_first: false,
            dimension_sampling: DimensionSamplingMode::Single,
            dimension_conversion: DimensionConversionMode::None,
            distance_mode: DistanceMode::Dependent,
            early_abandon_distances: false,
            early_exemplar_check: false,
            partition_reordering: false,
            cache_transforms: false,
            train_time_limit: None,
            test_time_limit: None,
            checkpoint_dir: None,
            checkpoint_interval: Duration::from_secs(60 * 60),
            seed: 0,
        }
    }

    /// Preset: a single split attempt per node.
    #[must_use]
    pub fn r1() -> Self {
        Self::new()
    }

    /// Preset: best of 5 split attempts per node.
    #[must_use]
    pub fn r5() -> Self {
        Self::new().with_r(5)
    }

    /// Preset: best of 10 split attempts per node.
    #[must_use]
    pub fn r10() -> Self {
        Self::new().with_r(10)
    }

    // --- Setters ---

    /// Set the distance-space builders splits draw from.
    #[must_use]
    pub fn with_spaces(mut self, spaces: Vec<DistanceSpace>) -> Self {
        self.spaces = spaces;
        self
    }

    /// Set the split scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: SplitScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Set the number of random split attempts per node.
    #[must_use]
    pub fn with_r(mut self, r: usize) -> Self {
        self.r = r;
        self
    }

    /// Build breadth-first instead of depth-first.
    #[must_use]
    pub fn with_breadth_first(mut self, breadth_first: bool) -> Self {
        self.breadth_first = breadth_first;
        self
    }

    /// Set the multivariate dimension sampling mode.
    #[must_use]
    pub fn with_dimension_sampling(mut self, mode: DimensionSamplingMode) -> Self {
        self.dimension_sampling = mode;
        self
    }

    /// Set the multivariate dimension conversion mode.
    #[must_use]
    pub fn with_dimension_conversion(mut self, mode: DimensionConversionMode) -> Self {
        self.dimension_conversion = mode;
        self
    }

    /// Set the multivariate distance mode.
    #[must_use]
    pub fn with_distance_mode(mut self, mode: DistanceMode) -> Self {
        self.distance_mode = mode;
        self
    }

    /// Enable early abandoning of distance computations against the current
    /// best distance.
    #[must_use]
    pub fn with_early_abandon_distances(mut self, enabled: bool) -> Self {
        self.early_abandon_distances = enabled;
        self
    }

    /// Enable the up-front exemplar-to-partition check.
    #[must_use]
    pub fn with_early_exemplar_check(mut self, enabled: bool) -> Self {
        self.early_exemplar_check = enabled;
        self
    }

    /// Enable probing partitions in descending size order per class.
    #[must_use]
    pub fn with_partition_reordering(mut self, enabled: bool) -> Self {
        self.partition_reordering = enabled;
        self
    }

    /// Enable the derivative transform cache.
    #[must_use]
    pub fn with_cache_transforms(mut self, enabled: bool) -> Self {
        self.cache_transforms = enabled;
        self
    }

    /// Set the train time contract. `None` means unlimited.
    #[must_use]
    pub fn with_train_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.train_time_limit = limit;
        self
    }

    /// Set the per-instance test time contract. `None` means unlimited.
    #[must_use]
    pub fn with_test_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.test_time_limit = limit;
        self
    }

    /// Enable checkpointing into `dir` at the given minimum interval.
    #[must_use]
    pub fn with_checkpoint(mut self, dir: PathBuf, interval: Duration) -> Self {
        self.checkpoint_dir = Some(dir);
        self.checkpoint_interval = interval;
        self
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the configured distance spaces.
    #[must_use]
    pub fn spaces(&self) -> &[DistanceSpace] {
        &self.spaces
    }

    /// Return the split scorer.
    #[must_use]
    pub fn scorer(&self) -> SplitScorer {
        self.scorer
    }

    /// Return the number of split attempts per node.
    #[must_use]
    pub fn r(&self) -> usize {
        self.r
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the train time contract.
    #[must_use]
    pub fn train_time_limit(&self) -> Option<Duration> {
        self.train_time_limit
    }

    /// Return the per-instance test time contract.
    #[must_use]
    pub fn test_time_limit(&self) -> Option<Duration> {
        self.test_time_limit
    }
}

impl Default for ProximityTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Class probability distribution from a prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax of probabilities).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        self.probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }

    /// Return the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// Return true if the distribution has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }
}

/// True when `t` is inside the (optional, strict) limit.
fn within(limit: Option<Duration>, t: Duration) -> bool {
    limit.is_none_or(|l| t < l)
}

/// A proximity-tree classifier.
///
/// `build` grows the tree from a node queue under an optional train time
/// contract; the queue and generator state survive across calls, so a
/// contracted build resumes where it stopped when `build` is called again —
/// from memory, or from a checkpoint after a restart. A partially built
/// tree predicts from whichever node traversal last reached.
#[derive(Debug)]
pub struct ProximityTree {
    config: ProximityTreeConfig,
    tree: Tree<Split>,
    queue: VecDeque<NodeId>,
    rng: ChaCha8Rng,
    n_classes: usize,
    elapsed: Duration,
    longest_node_build: Duration,
    last_checkpoint_elapsed: Duration,
    cache: Option<TransformCache>,
}

impl ProximityTree {
    /// Create an unbuilt classifier.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ProximityError::EmptyDistanceSpaces`] | no distance spaces configured |
    /// | [`ProximityError::InvalidSplitCount`] | `r` is zero |
    pub fn new(config: ProximityTreeConfig) -> Result<Self, ProximityError> {
        if config.spaces.is_empty() {
            return Err(ProximityError::EmptyDistanceSpaces);
        }
        if config.r < 1 {
            return Err(ProximityError::InvalidSplitCount { r: config.r });
        }
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let cache = config.cache_transforms.then(TransformCache::new);
        Ok(Self {
            config,
            tree: Tree::new(),
            queue: VecDeque::new(),
            rng,
            n_classes: 0,
            elapsed: Duration::ZERO,
            longest_node_build: Duration::ZERO,
            last_checkpoint_elapsed: Duration::ZERO,
            cache,
        })
    }

    /// Build (or continue building) the tree on the training data.
    ///
    /// A fresh build loads a checkpoint when one is configured and present;
    /// otherwise it initialises a root over the whole training set. The
    /// loop pops nodes while there is queue left and enough contract budget
    /// for another node in the worst observed case, so the tree may
    /// legitimately come out partially built; calling `build` again with a
    /// larger (or removed) contract continues without discarding progress.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::NonFiniteScore`] on numeric instability and
    /// checkpoint write errors when checkpointing is enabled. Contract
    /// exhaustion is a normal stop, not an error.
    #[instrument(skip(self, data), fields(n_instances = data.len(), r = self.config.r))]
    pub fn build(&mut self, data: &TimeSeriesInstances) -> Result<(), ProximityError> {
        let session_start = Instant::now();

        if self.tree.root().is_none() {
            let restored = self
                .config
                .checkpoint_dir
                .as_deref()
                .and_then(checkpoint::load)
                .filter(|env| env.n_classes == data.n_classes());
            match restored {
                Some(env) => {
                    self.tree = env.tree;
                    self.queue = env.queue;
                    self.rng = env.rng;
                    self.n_classes = env.n_classes;
                    self.elapsed = env.elapsed;
                    self.longest_node_build = env.longest_node_build;
                    self.last_checkpoint_elapsed = env.elapsed;
                    info!(
                        nodes = self.tree.size(),
                        queued = self.queue.len(),
                        "resumed build from checkpoint"
                    );
                }
                None => {
                    self.n_classes = data.n_classes();
                    self.elapsed = Duration::ZERO;
                    self.longest_node_build = Duration::ZERO;
                    self.last_checkpoint_elapsed = Duration::ZERO;
                    if self.config.cache_transforms {
                        self.cache = Some(TransformCache::new());
                    }
                    let root = self.tree.set_root(Split::new(
                        (0..data.len()).collect(),
                        data,
                    ));
                    self.queue.clear();
                    self.queue.push_back(root);
                    debug!(n_classes = self.n_classes, "initialised fresh build");
                }
            }
        }
        // Otherwise: a previous contracted call left the queue mid-build;
        // simply continue under the current contract.

        let mut work_done = false;
        loop {
            let projected =
                self.elapsed + session_start.elapsed() + self.longest_node_build;
            if !within(self.config.train_time_limit, projected) {
                break;
            }
            let Some(node_id) = self.queue.pop_front() else {
                break;
            };

            let stage_start = Instant::now();
            self.build_node(node_id, data)?;
            let stage = stage_start.elapsed();
            self.longest_node_build = self.longest_node_build.max(stage);
            work_done = true;

            debug!(
                node = %node_id,
                queued = self.queue.len(),
                nodes = self.tree.size(),
                stage_ms = stage.as_millis() as u64,
                "node built"
            );

            if self.config.checkpoint_dir.is_some() {
                let total = self.elapsed + session_start.elapsed();
                if total.saturating_sub(self.last_checkpoint_elapsed)
                    >= self.config.checkpoint_interval
                {
                    self.save_checkpoint(total)?;
                }
            }
        }

        self.elapsed += session_start.elapsed();
        if work_done && self.config.checkpoint_dir.is_some() {
            self.save_checkpoint(self.elapsed)?;
        }

        info!(
            nodes = self.tree.size(),
            height = self.tree.height(),
            queued = self.queue.len(),
            fully_built = self.is_fully_built(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "build session finished"
        );
        Ok(())
    }

    /// Run the best-of-R split search on one node, install the winning
    /// split, and enqueue its impure children.
    fn build_node(
        &mut self,
        node_id: NodeId,
        data: &TimeSeriesInstances,
    ) -> Result<(), ProximityError> {
        let indices = self.tree.get(node_id).value().data_indices().to_vec();

        let best = {
            let ctx = SplitContext {
                data,
                spaces: &self.config.spaces,
                scorer: self.config.scorer,
                sampling: self.config.dimension_sampling,
                conversion: self.config.dimension_conversion,
                distance_mode: self.config.distance_mode,
                early_abandon: self.config.early_abandon_distances,
                early_exemplar_check: self.config.early_exemplar_check,
                partition_reordering: self.config.partition_reordering,
            };
            // R independent full draws on identical input; the first
            // candidate reaching the maximum score wins.
            let mut best: Option<Split> = None;
            for _ in 0..self.config.r {
                let mut candidate = Split::new(indices.clone(), data);
                candidate.build(&ctx, &mut self.rng, self.cache.as_mut())?;
                let better = match &best {
                    None => true,
                    Some(current) => candidate.score() > current.score(),
                };
                if better {
                    best = Some(candidate);
                }
            }
            best
        };
        let Some(best) = best else {
            // r >= 1 is enforced at construction.
            return Ok(());
        };

        let n_partitions = best.n_partitions();
        self.tree.get_mut(node_id).set_value(best);

        for partition in 0..n_partitions {
            let child_indices = self
                .tree
                .get(node_id)
                .value()
                .partition_train_indices(partition);
            let child = Split::new(child_indices, data);
            self.tree.add_child(node_id, child);
        }

        // Pure children become permanent leaves; the rest join the queue.
        // Depth-first pushes at the head in reverse order so the first
        // partition is dequeued next; breadth-first appends in order.
        let children: Vec<NodeId> = self.tree.get(node_id).children().to_vec();
        if self.config.breadth_first {
            for child in children {
                if !self.tree.get(child).value().is_pure() {
                    self.queue.push_back(child);
                }
            }
        } else {
            for child in children.into_iter().rev() {
                if !self.tree.get(child).value().is_pure() {
                    self.queue.push_front(child);
                }
            }
        }
        Ok(())
    }

    fn save_checkpoint(&mut self, total_elapsed: Duration) -> Result<(), ProximityError> {
        let Some(dir) = self.config.checkpoint_dir.clone() else {
            return Ok(());
        };
        let envelope = CheckpointEnvelope::new(
            self.n_classes,
            self.tree.clone(),
            self.queue.clone(),
            total_elapsed,
            self.longest_node_build,
            self.rng.clone(),
        );
        checkpoint::save(&dir, &envelope)?;
        self.last_checkpoint_elapsed = total_elapsed;
        Ok(())
    }

    /// Predict the class distribution for a query instance.
    ///
    /// Walks from the root to a leaf by asking each node's split for the
    /// query's nearest-exemplar partition, stopping early when the
    /// per-instance test contract would be exceeded, and returns the reached
    /// node's class distribution. Entries are non-negative and sum to 1.
    ///
    /// # Errors
    ///
    /// Returns [`ProximityError::NotBuilt`] when `build` has never run.
    #[instrument(skip(self, inst))]
    pub fn predict(
        &self,
        inst: &TimeSeriesInstance,
    ) -> Result<ClassDistribution, ProximityError> {
        let Some(root) = self.tree.root() else {
            return Err(ProximityError::NotBuilt);
        };
        let start = Instant::now();
        let mut longest_step = Duration::ZERO;
        // A fresh generator per call keeps prediction immutable and
        // deterministic for identical queries.
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let mut node = self.tree.get(root);
        while !node.is_leaf()
            && within(self.config.test_time_limit, start.elapsed() + longest_step)
        {
            let step_start = Instant::now();
            let Some(partition) = node.value().partition_for_query(
                inst,
                self.config.early_abandon_distances,
                &mut rng,
            ) else {
                break;
            };
            node = self.tree.get(node.child(partition));
            longest_step = longest_step.max(step_start.elapsed());
        }

        Ok(ClassDistribution::new(node.value().distribution().to_vec()))
    }

    /// Replace the train time contract for subsequent `build` calls.
    ///
    /// Extending (or removing) the contract on a paused tree lets the next
    /// `build` call continue without discarding progress.
    pub fn set_train_time_limit(&mut self, limit: Option<Duration>) {
        self.config.train_time_limit = limit;
    }

    /// Replace the per-instance test time contract.
    pub fn set_test_time_limit(&mut self, limit: Option<Duration>) {
        self.config.test_time_limit = limit;
    }

    /// True once the queue is drained: every remaining leaf is pure.
    #[must_use]
    pub fn is_fully_built(&self) -> bool {
        self.tree.root().is_some() && self.queue.is_empty()
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// Height of the tree.
    #[must_use]
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Class cardinality seen at build time (0 before any build).
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// The underlying split tree.
    #[must_use]
    pub fn tree(&self) -> &Tree<Split> {
        &self.tree
    }

    /// The configuration this classifier was constructed with.
    #[must_use]
    pub fn config(&self) -> &ProximityTreeConfig {
        &self.config
    }
}
