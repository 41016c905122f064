//! Capability traits shared by every estimator in the workspace.
//!
//! An estimator is an unfitted description (hyperparameters only). Calling
//! [`Estimator::fit`] consumes nothing and returns an immutable fitted model
//! implementing [`Fitted`]. `D` is the input type the model consumes, e.g.
//! `[Trajectory]` for clustering and HMMs or `[Vec<usize>]` for MSMs.

/// Something that can be fitted to data of type `D`.
pub trait Estimator<D: ?Sized> {
    /// The fitted model produced by [`Estimator::fit`].
    type Fitted;
    /// Error returned when fitting fails.
    type Error;

    /// Fits a model to `data`.
    fn fit(&self, data: &D) -> Result<Self::Fitted, Self::Error>;
}

/// A fitted model that can label and score new data of type `D`.
pub trait Fitted<D: ?Sized> {
    /// Result of [`Fitted::transform`], typically one label sequence per input.
    type Output;
    /// Error returned by `transform` and `score`.
    type Error;

    /// Maps new data onto the model's discrete states.
    fn transform(&self, data: &D) -> Result<Self::Output, Self::Error>;

    /// Goodness of fit of the model on `data` (higher is better).
    fn score(&self, data: &D) -> Result<f64, Self::Error>;
}
