//! Error types for the msmkit-hmm crate.

use msmkit_cluster::ClusterError;
use msmkit_core::CoreError;
use msmkit_msm::MsmError;
use msmkit_spline::SplineError;

/// Error type for all fallible operations in the msmkit-hmm crate.
///
/// Hitting the iteration cap is not an error; it is reported through
/// [`FitStatus::MaxIterReached`](crate::FitStatus::MaxIterReached).
#[derive(Debug, Clone, thiserror::Error)]
pub enum HmmError {
    /// Returned when no trajectories, or only empty ones, are supplied.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when a trajectory's feature count differs from the model's.
    #[error("trajectory {trajectory} has {got} features, expected {expected}")]
    DimensionMismatch {
        /// Index of the offending trajectory.
        trajectory: usize,
        /// Expected number of features.
        expected: usize,
        /// Actual number of features.
        got: usize,
    },

    /// Returned when there are fewer frames than hidden states.
    #[error("{n_frames} frames cannot support {n_states} hidden states")]
    TooFewFrames {
        /// Total number of frames.
        n_frames: usize,
        /// Requested number of states.
        n_states: usize,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when model parameters are inconsistent.
    #[error("invalid parameters: {reason}")]
    InvalidParameters {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when EM breaks down: singular covariance, concentration
    /// above the tabulated range, empty state, or a non-finite likelihood.
    #[error("numerical failure at iteration {iteration}: {reason}")]
    NumericalFailure {
        /// EM iteration at which the failure occurred (0 = initialisation).
        iteration: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Propagated error from clustering during initialisation.
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    /// Propagated error from the MSM crate.
    #[error(transparent)]
    Msm(#[from] MsmError),

    /// Propagated error from the spline inverter.
    #[error(transparent)]
    Spline(#[from] SplineError),

    /// Propagated error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl HmmError {
    pub(crate) fn numerical(iteration: usize, reason: impl Into<String>) -> Self {
        Self::NumericalFailure {
            iteration,
            reason: reason.into(),
        }
    }
}
