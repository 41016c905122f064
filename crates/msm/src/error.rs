//! Error types for the msmkit-msm crate.

use msmkit_core::CoreError;

/// Error type for all fallible operations in the msmkit-msm crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MsmError {
    /// Returned when no sequences, or only empty sequences, are supplied.
    #[error("input data is empty")]
    EmptyData,

    /// Returned when the lag time is zero.
    #[error("lag time must be >= 1, got {lag}")]
    InvalidLag {
        /// The invalid lag.
        lag: usize,
    },

    /// Returned when no sequence is long enough to contain a lagged pair.
    #[error("no transitions observed at lag {lag}: every sequence is shorter than lag + 1")]
    NoTransitions {
        /// The lag time used for counting.
        lag: usize,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Returned when a label is not part of the model's state space.
    #[error("unknown state label {label}")]
    UnknownLabel {
        /// The offending label.
        label: usize,
    },

    /// Returned when a sequence holds a state index `>= n_states`.
    #[error("state {state} out of range for {n_states} states")]
    StateOutOfRange {
        /// The offending state index.
        state: usize,
        /// Number of states.
        n_states: usize,
    },

    /// Returned when the count graph is not strongly connected.
    #[error(
        "count matrix is disconnected: {n_components} strongly connected components \
         (largest has {largest} states)"
    )]
    Disconnected {
        /// Number of strongly connected components.
        n_components: usize,
        /// Size of the largest component.
        largest: usize,
    },

    /// Returned when an iterative estimator fails to converge or produces
    /// non-finite values.
    #[error("numerical failure after {iterations} iterations: {reason}")]
    NumericalFailure {
        /// Iterations completed before the failure.
        iterations: usize,
        /// Description of the failure.
        reason: String,
    },

    /// Returned when spectral analysis needs detailed balance and it fails.
    #[error("transition matrix violates detailed balance (max violation {max_violation:e})")]
    NotReversible {
        /// Largest `|π_i T_ij − π_j T_ji|`.
        max_violation: f64,
    },

    /// Returned when a matrix is not a valid row-stochastic transition matrix.
    #[error("invalid transition matrix: {reason}")]
    InvalidTransitionMatrix {
        /// Description of the problem.
        reason: String,
    },

    /// Propagated from the shared linear algebra routines.
    #[error(transparent)]
    Core(#[from] CoreError),
}
