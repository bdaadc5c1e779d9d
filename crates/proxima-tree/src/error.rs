use std::path::PathBuf;

/// Errors from proximity-tree construction, building, and prediction.
#[derive(Debug, thiserror::Error)]
pub enum ProximityError {
    /// Returned when the distance-space list is empty.
    #[error("at least one distance space must be configured")]
    EmptyDistanceSpaces,

    /// Returned when the number of split attempts per node is zero.
    #[error("split attempts per node must be at least 1, got {r}")]
    InvalidSplitCount {
        /// The invalid attempt count provided.
        r: usize,
    },

    /// Returned when a split score evaluates to NaN or infinity.
    #[error("split score is not finite: {score}")]
    NonFiniteScore {
        /// The offending score value.
        score: f64,
    },

    /// Returned when `predict` is called before any `build`.
    #[error("classifier has not been built")]
    NotBuilt,

    /// Returned when checkpoint serialization fails.
    #[error("failed to serialize checkpoint")]
    SerializeCheckpoint {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the checkpoint file fails.
    #[error("failed to write checkpoint to {path}")]
    WriteCheckpoint {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
