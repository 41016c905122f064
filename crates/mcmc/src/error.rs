//! Error types for the msmkit-mcmc crate.

use msmkit_msm::MsmError;

/// Error type for all fallible operations in the msmkit-mcmc crate.
///
/// Rejected proposals are not errors; they only lower
/// [`TransitionSamples::acceptance_rate`](crate::TransitionSamples::acceptance_rate).
#[derive(Debug, Clone, thiserror::Error)]
pub enum McmcError {
    /// Returned when a sampler parameter is out of range.
    #[error("invalid sampler configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when the count matrix holds no transitions.
    #[error("count matrix holds no transitions")]
    NoTransitions,

    /// Returned when the count graph is not strongly connected.
    #[error("count matrix is disconnected: {n_components} strongly connected components")]
    Disconnected {
        /// Number of strongly connected components.
        n_components: usize,
    },

    /// Propagated error from the MSM crate.
    #[error(transparent)]
    Msm(#[from] MsmError),
}
