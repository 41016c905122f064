//! Configuration for Markov state model estimation.

use crate::error::MsmError;
use crate::estimate::TransitionEstimator;

/// Configuration for Markov state model estimation.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use msmkit_msm::{MsmConfig, TransitionEstimator};
///
/// let config = MsmConfig::new()
///     .with_lag(5)
///     .with_estimator(TransitionEstimator::NonReversible);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct MsmConfig {
    lag: usize,
    estimator: TransitionEstimator,
    sliding_window: bool,
    prior: f64,
    tol: f64,
    max_iter: usize,
}

impl MsmConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `lag = 1`, `estimator = Reversible`, `sliding_window = true`,
    /// `prior = 0.0`, `tol = 1e-10`, `max_iter = 10_000`.
    pub fn new() -> Self {
        Self {
            lag: 1,
            estimator: TransitionEstimator::Reversible,
            sliding_window: true,
            prior: 0.0,
            tol: 1e-10,
            max_iter: 10_000,
        }
    }

    /// Sets the lag time in frames.
    pub fn with_lag(mut self, lag: usize) -> Self {
        self.lag = lag;
        self
    }

    /// Sets the transition matrix estimator.
    pub fn with_estimator(mut self, estimator: TransitionEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Counts every lagged pair (`true`) or only non-overlapping ones (`false`).
    pub fn with_sliding_window(mut self, sliding_window: bool) -> Self {
        self.sliding_window = sliding_window;
        self
    }

    /// Sets the pseudo-count added to every count matrix entry.
    pub fn with_prior(mut self, prior: f64) -> Self {
        self.prior = prior;
        self
    }

    /// Sets the convergence tolerance of the reversible estimator.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the iteration cap of the reversible estimator.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    // --- Accessors ---

    /// Returns the lag time.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Returns the estimator.
    pub fn estimator(&self) -> TransitionEstimator {
        self.estimator
    }

    /// Returns whether sliding-window counting is used.
    pub fn sliding_window(&self) -> bool {
        self.sliding_window
    }

    /// Returns the pseudo-count.
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Returns the convergence tolerance.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Returns the iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), MsmError> {
        if self.lag == 0 {
            return Err(MsmError::InvalidLag { lag: self.lag });
        }
        if !self.prior.is_finite() || self.prior < 0.0 {
            return Err(MsmError::InvalidConfig {
                reason: format!("prior must be finite and >= 0, got {}", self.prior),
            });
        }
        if !self.tol.is_finite() || self.tol <= 0.0 {
            return Err(MsmError::InvalidConfig {
                reason: format!("tol must be finite and positive, got {}", self.tol),
            });
        }
        if self.max_iter == 0 {
            return Err(MsmError::InvalidConfig {
                reason: "max_iter must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MsmConfig {
    fn default() -> Self {
        Self::new()
    }
}
