//! Unfitted HMM descriptions and the dynamic `fit_hmm` entry point.
//!
//! [`GaussianHmmSpec`] and [`VonMisesHmmSpec`] fix the emission family in the
//! type; [`fit_hmm`] picks it at run time from [`HmmConfig::emission`] and
//! returns a [`FittedHmm`].

use msmkit_core::{Estimator, Fitted, Trajectory};
use msmkit_msm::TransitionMatrix;
use ndarray::{Array1, Array2};

use crate::config::{CovarianceType, EmissionKind, HmmConfig};
use crate::em::{check_training_data, fit_em};
use crate::error::HmmError;
use crate::gaussian::Gaussian;
use crate::model::{FitReport, GaussianHmm, VonMisesHmm};
use crate::von_mises::VonMises;

/// Gaussian HMM hyperparameters.
///
/// # Examples
///
/// ```
/// use msmkit_core::Trajectory;
/// use msmkit_hmm::{CovarianceType, GaussianHmmSpec};
///
/// let data = vec![Trajectory::from_scalars(vec![-2.0, -2.1, -1.9, 2.0, 2.1, 1.9]).unwrap()];
/// let hmm = GaussianHmmSpec::new(2)
///     .with_covariance_type(CovarianceType::Diagonal)
///     .with_seed(1)
///     .fit(&data)
///     .unwrap();
/// assert_eq!(hmm.n_states(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GaussianHmmSpec {
    config: HmmConfig,
}

impl GaussianHmmSpec {
    /// Defaults of [`HmmConfig::new`] with Gaussian emissions.
    pub fn new(n_states: usize) -> Self {
        Self {
            config: HmmConfig::new(n_states),
        }
    }

    /// Uses `config`, forcing Gaussian emissions.
    pub fn from_config(config: HmmConfig) -> Self {
        Self {
            config: config.with_emission(EmissionKind::Gaussian),
        }
    }

    /// Sets the covariance structure.
    pub fn with_covariance_type(mut self, covariance_type: CovarianceType) -> Self {
        self.config = self.config.with_covariance_type(covariance_type);
        self
    }

    /// Sets the EM iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config = self.config.with_max_iter(max_iter);
        self
    }

    /// Sets the log-likelihood improvement below which EM stops.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config = self.config.with_tol(tol);
        self
    }

    /// Seeds the k-centers initialisation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config = self.config.with_seed(seed);
        self
    }

    /// The underlying configuration.
    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    /// Fits the model by EM.
    pub fn fit(&self, data: &[Trajectory]) -> Result<GaussianHmm, HmmError> {
        self.fit_until(data, || false)
    }

    /// Like [`fit`](Self::fit), but checks `stop` before every iteration and
    /// returns the current model with [`FitStatus::Stopped`](crate::FitStatus::Stopped)
    /// once it yields `true`.
    pub fn fit_until(
        &self,
        data: &[Trajectory],
        stop: impl FnMut() -> bool,
    ) -> Result<GaussianHmm, HmmError> {
        self.config.validate()?;
        check_training_data(data, self.config.n_states())?;
        let init = Gaussian::initialize(data, &self.config)?;
        fit_em(data, init, &self.config, stop)
    }
}

impl Estimator<[Trajectory]> for GaussianHmmSpec {
    type Fitted = GaussianHmm;
    type Error = HmmError;

    fn fit(&self, data: &[Trajectory]) -> Result<GaussianHmm, HmmError> {
        GaussianHmmSpec::fit(self, data)
    }
}

/// Von Mises HMM hyperparameters. Input features are angles in radians.
#[derive(Debug, Clone)]
pub struct VonMisesHmmSpec {
    config: HmmConfig,
}

impl VonMisesHmmSpec {
    /// Defaults of [`HmmConfig::new`] with von Mises emissions.
    pub fn new(n_states: usize) -> Self {
        Self {
            config: HmmConfig::new(n_states).with_emission(EmissionKind::VonMises),
        }
    }

    /// Uses `config`, forcing von Mises emissions.
    pub fn from_config(config: HmmConfig) -> Self {
        Self {
            config: config.with_emission(EmissionKind::VonMises),
        }
    }

    /// Sets the EM iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config = self.config.with_max_iter(max_iter);
        self
    }

    /// Sets the log-likelihood improvement below which EM stops.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.config = self.config.with_tol(tol);
        self
    }

    /// Seeds the k-centers initialisation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config = self.config.with_seed(seed);
        self
    }

    /// The underlying configuration.
    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    /// Fits the model by EM.
    pub fn fit(&self, data: &[Trajectory]) -> Result<VonMisesHmm, HmmError> {
        self.fit_until(data, || false)
    }

    /// Cooperative-stop variant of [`fit`](Self::fit).
    pub fn fit_until(
        &self,
        data: &[Trajectory],
        stop: impl FnMut() -> bool,
    ) -> Result<VonMisesHmm, HmmError> {
        self.config.validate()?;
        check_training_data(data, self.config.n_states())?;
        let init = VonMises::initialize(data, &self.config)?;
        fit_em(data, init, &self.config, stop)
    }
}

impl Estimator<[Trajectory]> for VonMisesHmmSpec {
    type Fitted = VonMisesHmm;
    type Error = HmmError;

    fn fit(&self, data: &[Trajectory]) -> Result<VonMisesHmm, HmmError> {
        VonMisesHmmSpec::fit(self, data)
    }
}

/// An HMM whose emission family was chosen at run time.
#[derive(Debug, Clone)]
pub enum FittedHmm {
    Gaussian(GaussianHmm),
    VonMises(VonMisesHmm),
}

macro_rules! dispatch {
    ($self:expr, $hmm:ident => $body:expr) => {
        match $self {
            FittedHmm::Gaussian($hmm) => $body,
            FittedHmm::VonMises($hmm) => $body,
        }
    };
}

impl FittedHmm {
    pub fn n_states(&self) -> usize {
        dispatch!(self, h => h.n_states())
    }

    pub fn n_features(&self) -> usize {
        dispatch!(self, h => h.n_features())
    }

    pub fn emission_kind(&self) -> EmissionKind {
        match self {
            FittedHmm::Gaussian(_) => EmissionKind::Gaussian,
            FittedHmm::VonMises(_) => EmissionKind::VonMises,
        }
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        dispatch!(self, h => h.transition_matrix())
    }

    pub fn start_probabilities(&self) -> &Array1<f64> {
        dispatch!(self, h => h.start_probabilities())
    }

    pub fn fit_report(&self) -> Option<&FitReport> {
        dispatch!(self, h => h.fit_report())
    }

    pub fn populations(&self) -> Result<Array1<f64>, HmmError> {
        dispatch!(self, h => h.populations())
    }

    pub fn timescales(&self) -> Result<Array1<f64>, HmmError> {
        dispatch!(self, h => h.timescales())
    }

    pub fn predict_proba(&self, data: &[Trajectory]) -> Result<Vec<Array2<f64>>, HmmError> {
        dispatch!(self, h => h.predict_proba(data))
    }
}

impl Fitted<[Trajectory]> for FittedHmm {
    type Output = Vec<Vec<usize>>;
    type Error = HmmError;

    fn transform(&self, data: &[Trajectory]) -> Result<Vec<Vec<usize>>, HmmError> {
        dispatch!(self, h => h.decode(data))
    }

    fn score(&self, data: &[Trajectory]) -> Result<f64, HmmError> {
        dispatch!(self, h => h.log_likelihood(data))
    }
}

/// Fits an HMM with the emission family named in `config`.
pub fn fit_hmm(data: &[Trajectory], config: &HmmConfig) -> Result<FittedHmm, HmmError> {
    fit_hmm_until(data, config, || false)
}

/// [`fit_hmm`] with a cooperative stop check at iteration boundaries.
pub fn fit_hmm_until(
    data: &[Trajectory],
    config: &HmmConfig,
    stop: impl FnMut() -> bool,
) -> Result<FittedHmm, HmmError> {
    match config.emission() {
        EmissionKind::Gaussian => GaussianHmmSpec::from_config(config.clone())
            .fit_until(data, stop)
            .map(FittedHmm::Gaussian),
        EmissionKind::VonMises => VonMisesHmmSpec::from_config(config.clone())
            .fit_until(data, stop)
            .map(FittedHmm::VonMises),
    }
}

impl Estimator<[Trajectory]> for HmmConfig {
    type Fitted = FittedHmm;
    type Error = HmmError;

    fn fit(&self, data: &[Trajectory]) -> Result<FittedHmm, HmmError> {
        fit_hmm(data, self)
    }
}
