//! Error types for the msmkit-core crate.

/// Error type for fallible operations in the msmkit-core crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// Returned when input data is empty.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when the feature count is zero.
    #[error("number of features must be at least 1")]
    ZeroFeatures,

    /// Returned when the flat data length is not a multiple of the feature count.
    #[error("data length {len} is not a multiple of n_features = {n_features}")]
    RaggedData {
        /// Length of the flat data buffer.
        len: usize,
        /// Requested number of features.
        n_features: usize,
    },

    /// Returned when a row has a different length from the first row.
    #[error("row {row} has {got} features, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending row.
        row: usize,
        /// Expected number of features.
        expected: usize,
        /// Actual number of features.
        got: usize,
    },

    /// Returned when input contains NaN or infinity.
    #[error("input data contains non-finite values")]
    NonFiniteData,
}
