//! Error types for dataset validation.

/// Errors from time-series instance and dataset validation.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Returned when an instance is created with no dimensions.
    #[error("instance must have at least one dimension")]
    NoDimensions,

    /// Returned when a dimension contains no time steps.
    #[error("dimension {dimension} is empty")]
    EmptySeries {
        /// Zero-based index of the empty dimension.
        dimension: usize,
    },

    /// Returned when dimensions of one instance have different lengths.
    #[error("dimension {dimension} has length {got}, expected {expected}")]
    DimensionLengthMismatch {
        /// Zero-based index of the offending dimension.
        dimension: usize,
        /// Length of dimension 0.
        expected: usize,
        /// Length of the offending dimension.
        got: usize,
    },

    /// Returned when a series value is NaN or infinite.
    #[error("non-finite value at dimension {dimension}, position {position}")]
    NonFiniteValue {
        /// Zero-based index of the offending dimension.
        dimension: usize,
        /// Zero-based time step of the first non-finite value.
        position: usize,
    },

    /// Returned when a dataset is created with no instances.
    #[error("dataset must contain at least one instance")]
    EmptyDataset,

    /// Returned when a dataset is created with zero classes.
    #[error("dataset must have at least one class")]
    ZeroClasses,

    /// Returned when an instance label is outside the declared class range.
    #[error("instance {instance} has label {label}, expected a label below {n_classes}")]
    LabelOutOfRange {
        /// Zero-based index of the offending instance.
        instance: usize,
        /// The out-of-range label.
        label: usize,
        /// The declared number of classes.
        n_classes: usize,
    },
}
