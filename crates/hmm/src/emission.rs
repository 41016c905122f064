//! The emission-model seam of the HMM.
//!
//! The EM driver and the forward-backward recursions are written once
//! against [`Emission`]; each family supplies per-frame log densities,
//! sufficient statistics and a closed-form M-step.

use std::fmt::Debug;

use msmkit_core::Trajectory;
use ndarray::{Array2, ArrayView2};

use crate::error::HmmError;

/// Per-state observation model.
pub trait Emission: Clone + Debug + Send + Sync + Sized {
    /// Sufficient statistics gathered during the E-step.
    type Stats: Send;

    /// Number of hidden states.
    fn n_states(&self) -> usize;

    /// Number of features per frame.
    fn n_features(&self) -> usize;

    /// `ln p(x_t | state k)` for every frame, as an `n_frames × n_states`
    /// matrix.
    fn log_likelihoods(&self, traj: &Trajectory) -> Array2<f64>;

    /// Zeroed statistics for this model's shape.
    fn empty_stats(&self) -> Self::Stats;

    /// Adds the γ-weighted contribution of `traj` to `stats`.
    ///
    /// `gamma` is `n_frames × n_states` with rows summing to one.
    fn accumulate(&self, stats: &mut Self::Stats, traj: &Trajectory, gamma: ArrayView2<f64>);

    /// Combines statistics from two partitions of the data.
    fn merge_stats(a: Self::Stats, b: Self::Stats) -> Self::Stats;

    /// Maximises the expected complete-data log-likelihood.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::NumericalFailure`] tagged with `iteration` when
    /// no valid parameters exist (a state with zero occupancy, a singular
    /// covariance, a concentration above the tabulated range).
    fn m_step(&self, stats: &Self::Stats, iteration: usize) -> Result<Self, HmmError>;
}
