//! Labeled time-series dataset types.
//!
//! Validated multivariate instances and the dataset view a proximity-tree
//! classifier consumes: instance access, class-label cardinality, per-class
//! index groupings, and the handful of summary statistics parameter spaces
//! are derived from. No file formats, no I/O.

mod dataset;
mod error;
mod instance;

pub use dataset::TimeSeriesInstances;
pub use error::DataError;
pub use instance::TimeSeriesInstance;
