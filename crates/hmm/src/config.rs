//! Configuration for HMM fitting.

use msmkit_msm::TransitionEstimator;

use crate::error::HmmError;

/// Emission family of the hidden states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmissionKind {
    /// Multivariate Gaussian per state.
    #[default]
    Gaussian,
    /// Independent von Mises distribution per feature and state. Features
    /// are angles in radians.
    VonMises,
}

/// Covariance structure of Gaussian emissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CovarianceType {
    /// One variance per feature.
    #[default]
    Diagonal,
    /// Full D×D covariance matrix.
    Full,
}

/// Configuration for Baum-Welch fitting.
///
/// Use the builder methods to customise parameters.
///
/// # Example
///
/// ```
/// use msmkit_hmm::{CovarianceType, EmissionKind, HmmConfig};
///
/// let config = HmmConfig::new(3)
///     .with_emission(EmissionKind::Gaussian)
///     .with_covariance_type(CovarianceType::Full)
///     .with_max_iter(200);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct HmmConfig {
    n_states: usize,
    emission: EmissionKind,
    covariance_type: CovarianceType,
    max_iter: usize,
    tol: f64,
    min_covar: f64,
    estimator: TransitionEstimator,
    persistence: f64,
    init_stride: usize,
    seed: Option<u64>,
}

impl HmmConfig {
    /// Creates a new configuration for `n_states` hidden states.
    ///
    /// Defaults: Gaussian emissions with diagonal covariance, `max_iter = 100`,
    /// `tol = 1e-4`, `min_covar = 1e-3`, reversible transition estimator,
    /// initial self-transition probability `persistence = 0.9`,
    /// `init_stride = 1`, no seed (k-centers starts at frame 0).
    pub fn new(n_states: usize) -> Self {
        Self {
            n_states,
            emission: EmissionKind::Gaussian,
            covariance_type: CovarianceType::Diagonal,
            max_iter: 100,
            tol: 1e-4,
            min_covar: 1e-3,
            estimator: TransitionEstimator::Reversible,
            persistence: 0.9,
            init_stride: 1,
            seed: None,
        }
    }

    /// Sets the number of hidden states.
    pub fn with_n_states(mut self, n_states: usize) -> Self {
        self.n_states = n_states;
        self
    }

    /// Sets the emission family.
    pub fn with_emission(mut self, emission: EmissionKind) -> Self {
        self.emission = emission;
        self
    }

    /// Sets the Gaussian covariance structure. Ignored for von Mises.
    pub fn with_covariance_type(mut self, covariance_type: CovarianceType) -> Self {
        self.covariance_type = covariance_type;
        self
    }

    /// Sets the maximum number of EM iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the log-likelihood improvement below which EM stops.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the floor on covariance eigenvalues. Ignored for von Mises.
    pub fn with_min_covar(mut self, min_covar: f64) -> Self {
        self.min_covar = min_covar;
        self
    }

    /// Sets the estimator applied to expected transition counts.
    pub fn with_estimator(mut self, estimator: TransitionEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    /// Sets the initial self-transition probability.
    pub fn with_persistence(mut self, persistence: f64) -> Self {
        self.persistence = persistence;
        self
    }

    /// Sets the frame stride used when clustering for initial parameters.
    pub fn with_init_stride(mut self, init_stride: usize) -> Self {
        self.init_stride = init_stride;
        self
    }

    /// Seeds the choice of the first k-centers centroid.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    // --- Accessors ---

    /// Returns the number of hidden states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Returns the emission family.
    pub fn emission(&self) -> EmissionKind {
        self.emission
    }

    /// Returns the covariance structure.
    pub fn covariance_type(&self) -> CovarianceType {
        self.covariance_type
    }

    /// Returns the iteration cap.
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Returns the convergence tolerance.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    /// Returns the covariance floor.
    pub fn min_covar(&self) -> f64 {
        self.min_covar
    }

    /// Returns the transition estimator.
    pub fn estimator(&self) -> TransitionEstimator {
        self.estimator
    }

    /// Returns the initial self-transition probability.
    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    /// Returns the initialisation stride.
    pub fn init_stride(&self) -> usize {
        self.init_stride
    }

    /// Returns the k-centers seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), HmmError> {
        if self.n_states == 0 {
            return Err(HmmError::InvalidConfig {
                reason: "n_states must be >= 1".to_string(),
            });
        }
        if self.max_iter == 0 {
            return Err(HmmError::InvalidConfig {
                reason: "max_iter must be >= 1".to_string(),
            });
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(HmmError::InvalidConfig {
                reason: format!("tol must be finite and >= 0, got {}", self.tol),
            });
        }
        if !self.min_covar.is_finite() || self.min_covar <= 0.0 {
            return Err(HmmError::InvalidConfig {
                reason: format!("min_covar must be finite and positive, got {}", self.min_covar),
            });
        }
        if !(self.persistence > 0.0 && self.persistence < 1.0) {
            return Err(HmmError::InvalidConfig {
                reason: format!("persistence must be in (0, 1), got {}", self.persistence),
            });
        }
        if self.init_stride == 0 {
            return Err(HmmError::InvalidConfig {
                reason: "init_stride must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HmmConfig::new(4);
        assert_eq!(cfg.n_states(), 4);
        assert_eq!(cfg.emission(), EmissionKind::Gaussian);
        assert_eq!(cfg.covariance_type(), CovarianceType::Diagonal);
        assert_eq!(cfg.max_iter(), 100);
        assert_eq!(cfg.tol(), 1e-4);
        assert_eq!(cfg.min_covar(), 1e-3);
        assert_eq!(cfg.estimator(), TransitionEstimator::Reversible);
        assert_eq!(cfg.persistence(), 0.9);
        assert_eq!(cfg.init_stride(), 1);
        assert_eq!(cfg.seed(), None);
        assert!(cfg.validate().is_ok());
        assert_eq!(HmmConfig::default().n_states(), 2);
    }

    #[test]
    fn test_builder_chaining() {
        let cfg = HmmConfig::new(2)
            .with_n_states(5)
            .with_emission(EmissionKind::VonMises)
            .with_covariance_type(CovarianceType::Full)
            .with_max_iter(10)
            .with_tol(0.0)
            .with_min_covar(1e-6)
            .with_estimator(TransitionEstimator::NonReversible)
            .with_persistence(0.5)
            .with_init_stride(4)
            .with_seed(3);
        assert_eq!(cfg.n_states(), 5);
        assert_eq!(cfg.emission(), EmissionKind::VonMises);
        assert_eq!(cfg.covariance_type(), CovarianceType::Full);
        assert_eq!(cfg.max_iter(), 10);
        assert_eq!(cfg.tol(), 0.0);
        assert_eq!(cfg.min_covar(), 1e-6);
        assert_eq!(cfg.estimator(), TransitionEstimator::NonReversible);
        assert_eq!(cfg.persistence(), 0.5);
        assert_eq!(cfg.init_stride(), 4);
        assert_eq!(cfg.seed(), Some(3));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        let bad = [
            HmmConfig::new(0),
            HmmConfig::new(2).with_max_iter(0),
            HmmConfig::new(2).with_tol(-1.0),
            HmmConfig::new(2).with_tol(f64::NAN),
            HmmConfig::new(2).with_min_covar(0.0),
            HmmConfig::new(2).with_persistence(1.0),
            HmmConfig::new(2).with_persistence(0.0),
            HmmConfig::new(2).with_init_stride(0),
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(HmmError::InvalidConfig { .. })),
                "{cfg:?} should be rejected"
            );
        }
    }
}
