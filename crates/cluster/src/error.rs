//! Error types for the msmkit-cluster crate.

use msmkit_core::CoreError;

/// Error type for all fallible operations in the msmkit-cluster crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterError {
    /// Returned when no trajectories are supplied.
    #[error("no trajectories provided")]
    EmptyData,

    /// Returned when a trajectory's feature count differs from the rest.
    #[error("trajectory {trajectory} has {got} features, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending trajectory.
        trajectory: usize,
        /// Expected number of features.
        expected: usize,
        /// Actual number of features.
        got: usize,
    },

    /// Returned when the requested number of clusters is zero.
    #[error("n_clusters must be >= 1, got {k}")]
    InvalidK {
        /// The invalid k value.
        k: usize,
    },

    /// Returned when the regular-spatial cutoff is negative or non-finite.
    #[error("d_min must be finite and >= 0, got {d_min}")]
    InvalidThreshold {
        /// The invalid cutoff.
        d_min: f64,
    },

    /// Returned when a periodic metric has a non-positive or non-finite period.
    #[error("period must be finite and > 0, got {period}")]
    InvalidPeriod {
        /// The invalid period.
        period: f64,
    },

    /// Propagated from trajectory construction.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClusterError {
    /// Maps the core shape errors onto clustering's own variants.
    pub(crate) fn from_core(e: CoreError) -> Self {
        match e {
            CoreError::EmptyData => Self::EmptyData,
            CoreError::DimensionMismatch { row, expected, got } => Self::DimensionMismatch {
                trajectory: row,
                expected,
                got,
            },
            other => Self::Core(other),
        }
    }
}
