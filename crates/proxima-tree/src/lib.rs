//! Proximity-tree classification for time series.
//!
//! Builds a classification tree by recursively partitioning the training set
//! with randomized, distance-based splits: each node picks a random elastic
//! distance configuration and one exemplar per class, then routes every
//! instance to its nearest exemplar. Leaves store class-probability
//! distributions. Supports anytime (time-contracted) building with
//! checkpoint/resume, and contracted prediction.

mod checkpoint;
mod classifier;
mod error;
mod params;
mod scorer;
mod split;
mod transform;
mod tree;

pub use classifier::{ClassDistribution, ProximityTree, ProximityTreeConfig};
pub use error::ProximityError;
pub use params::{DataStats, DistanceSpace, ParamDomain, ParamSpace};
pub use scorer::SplitScorer;
pub use split::Split;
pub use transform::{
    DimensionConversionMode, DimensionSamplingMode, DistanceMode, TransformPipeline,
};
pub use tree::{NodeId, Tree, TreeNode};
