//! Multivariate Gaussian emissions with diagonal or full covariance.

use std::f64::consts::PI;

use msmkit_cluster::KCenters;
use msmkit_core::{Estimator, Trajectory, numeric};
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis, s};
use rand_distr::{Distribution, StandardNormal};

use crate::config::{CovarianceType, HmmConfig};
use crate::emission::Emission;
use crate::error::HmmError;

/// States whose total posterior weight falls below this are treated as
/// empty by the M-step.
pub(crate) const MIN_OCCUPANCY: f64 = 1e-10;

/// Per-state covariances.
#[derive(Debug, Clone, PartialEq)]
pub enum Covariances {
    /// `K × D` variances.
    Diagonal(Array2<f64>),
    /// `K × D × D` covariance matrices.
    Full(Array3<f64>),
}

impl Covariances {
    /// Covariance structure of these parameters.
    pub fn kind(&self) -> CovarianceType {
        match self {
            Covariances::Diagonal(_) => CovarianceType::Diagonal,
            Covariances::Full(_) => CovarianceType::Full,
        }
    }
}

#[derive(Debug, Clone)]
enum Factor {
    Diagonal { inv_var: Array2<f64> },
    Full { chol: Vec<DMatrix<f64>> },
}

/// Gaussian emission parameters for every hidden state.
#[derive(Debug, Clone)]
pub struct Gaussian {
    means: Array2<f64>,
    covariances: Covariances,
    min_covar: f64,
    factor: Factor,
    log_norm: Array1<f64>,
}

impl Gaussian {
    /// Builds emissions from `K × D` means and matching covariances.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::InvalidParameters`] if shapes disagree, a value
    /// is not finite, a variance is not positive, or a full covariance is
    /// not positive definite.
    pub fn new(means: Array2<f64>, covariances: Covariances) -> Result<Self, HmmError> {
        let (k, d) = means.dim();
        if k == 0 || d == 0 {
            return Err(HmmError::InvalidParameters {
                reason: format!("means must be non-empty, got {k}x{d}"),
            });
        }
        if means.iter().any(|v| !v.is_finite()) {
            return Err(HmmError::InvalidParameters {
                reason: "means contain non-finite values".to_string(),
            });
        }
        let shape_ok = match &covariances {
            Covariances::Diagonal(v) => v.dim() == (k, d),
            Covariances::Full(c) => c.dim() == (k, d, d),
        };
        if !shape_ok {
            return Err(HmmError::InvalidParameters {
                reason: format!("covariances do not match means of shape {k}x{d}"),
            });
        }
        Self::factorize(means, covariances, 1e-3).map_err(|reason| HmmError::InvalidParameters { reason })
    }

    /// Sets the covariance floor used by subsequent M-steps.
    pub fn with_min_covar(mut self, min_covar: f64) -> Self {
        self.min_covar = min_covar;
        self
    }

    fn factorize(means: Array2<f64>, covariances: Covariances, min_covar: f64) -> Result<Self, String> {
        let d = means.ncols();
        let base = d as f64 * (2.0 * PI).ln();
        let (factor, log_norm) = match &covariances {
            Covariances::Diagonal(var) => {
                if let Some(v) = var.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                    return Err(format!("variance {v} is not positive and finite"));
                }
                let log_norm = var
                    .rows()
                    .into_iter()
                    .map(|row| -0.5 * (base + row.iter().map(|v| v.ln()).sum::<f64>()))
                    .collect();
                (Factor::Diagonal { inv_var: var.mapv(f64::recip) }, log_norm)
            }
            Covariances::Full(cov) => {
                let mut chol = Vec::with_capacity(cov.len_of(Axis(0)));
                let mut log_norm = Array1::zeros(cov.len_of(Axis(0)));
                for (state, c) in cov.outer_iter().enumerate() {
                    if c.iter().any(|v| !v.is_finite()) {
                        return Err(format!("covariance of state {state} is not finite"));
                    }
                    let m = DMatrix::from_fn(d, d, |i, j| c[[i, j]]);
                    let l = Cholesky::new(m)
                        .ok_or_else(|| format!("covariance of state {state} is not positive definite"))?
                        .unpack();
                    let log_det = 2.0 * l.diagonal().iter().map(|v| v.ln()).sum::<f64>();
                    log_norm[state] = -0.5 * (base + log_det);
                    chol.push(l);
                }
                (Factor::Full { chol }, log_norm)
            }
        };
        Ok(Self {
            means,
            covariances,
            min_covar,
            factor,
            log_norm,
        })
    }

    /// Initial parameters from data: k-centers means on strided frames and
    /// the pooled per-feature variance for every state.
    pub(crate) fn initialize(data: &[Trajectory], config: &HmmConfig) -> Result<Self, HmmError> {
        let strided: Vec<Trajectory> = data.iter().map(|t| t.strided(config.init_stride())).collect();
        let mut kcenters = KCenters::new(config.n_states());
        if let Some(seed) = config.seed() {
            kcenters = kcenters.with_seed(seed);
        }
        let clustering = kcenters.fit(&strided)?;
        let k = clustering.n_clusters();
        if k < config.n_states() {
            return Err(HmmError::TooFewFrames {
                n_frames: k,
                n_states: config.n_states(),
            });
        }
        let d = clustering.n_features();
        let means = Array2::from_shape_vec((k, d), clustering.centroids().as_slice().to_vec())
            .map_err(|e| HmmError::InvalidParameters { reason: e.to_string() })?;

        let pooled = Trajectory::concat(data)?;
        let variances: Vec<f64> = (0..d)
            .map(|j| {
                let column: Vec<f64> = pooled.frames().map(|f| f[j]).collect();
                numeric::population_variance(&column).max(config.min_covar())
            })
            .collect();
        let covariances = match config.covariance_type() {
            CovarianceType::Diagonal => {
                Covariances::Diagonal(Array2::from_shape_fn((k, d), |(_, j)| variances[j]))
            }
            CovarianceType::Full => Covariances::Full(Array3::from_shape_fn((k, d, d), |(_, i, j)| {
                if i == j { variances[i] } else { 0.0 }
            })),
        };
        Self::factorize(means, covariances, config.min_covar())
            .map_err(|reason| HmmError::numerical(0, reason))
    }

    /// `K × D` state means.
    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    /// State covariances.
    pub fn covariances(&self) -> &Covariances {
        &self.covariances
    }

    /// Covariance floor applied in the M-step.
    pub fn min_covar(&self) -> f64 {
        self.min_covar
    }

    /// Draws one observation from state `state` into `out`.
    pub fn sample_frame<R: rand::Rng + ?Sized>(&self, state: usize, rng: &mut R, out: &mut [f64]) {
        let d = self.means.ncols();
        let z = DVector::<f64>::from_fn(d, |_, _| StandardNormal.sample(rng));
        let mean = self.means.row(state);
        match &self.factor {
            Factor::Diagonal { inv_var } => {
                for j in 0..d {
                    out[j] = mean[j] + z[j] / inv_var[[state, j]].sqrt();
                }
            }
            Factor::Full { chol } => {
                let x = &chol[state] * z;
                for i in 0..d {
                    out[i] = mean[i] + x[i];
                }
            }
        }
    }
}

/// Sufficient statistics for Gaussian emissions.
///
/// Moments are taken about the means of the model that accumulated them,
/// so features with a large common offset keep their precision.
#[derive(Debug, Clone)]
pub struct GaussianStats {
    weights: Array1<f64>,
    first: Array2<f64>,
    second: SecondMoment,
}

#[derive(Debug, Clone)]
enum SecondMoment {
    Diagonal(Array2<f64>),
    Full(Array3<f64>),
}

impl Emission for Gaussian {
    type Stats = GaussianStats;

    fn n_states(&self) -> usize {
        self.means.nrows()
    }

    fn n_features(&self) -> usize {
        self.means.ncols()
    }

    fn log_likelihoods(&self, traj: &Trajectory) -> Array2<f64> {
        let k = self.n_states();
        let d = self.n_features();
        let mut out = Array2::<f64>::zeros((traj.n_frames(), k));
        let mut diff = DVector::<f64>::zeros(d);
        for (t, frame) in traj.frames().enumerate() {
            for state in 0..k {
                let mean = self.means.row(state);
                for j in 0..d {
                    diff[j] = frame[j] - mean[j];
                }
                let mahalanobis = match &self.factor {
                    Factor::Diagonal { inv_var } => diff
                        .iter()
                        .zip(inv_var.row(state))
                        .map(|(x, w)| x * x * w)
                        .sum::<f64>(),
                    Factor::Full { chol } => {
                        let mut z = diff.clone();
                        if chol[state].solve_lower_triangular_mut(&mut z) {
                            z.norm_squared()
                        } else {
                            f64::INFINITY
                        }
                    }
                };
                out[[t, state]] = self.log_norm[state] - 0.5 * mahalanobis;
            }
        }
        out
    }

    fn empty_stats(&self) -> GaussianStats {
        let (k, d) = self.means.dim();
        GaussianStats {
            weights: Array1::zeros(k),
            first: Array2::zeros((k, d)),
            second: match self.covariances {
                Covariances::Diagonal(_) => SecondMoment::Diagonal(Array2::zeros((k, d))),
                Covariances::Full(_) => SecondMoment::Full(Array3::zeros((k, d, d))),
            },
        }
    }

    fn accumulate(&self, stats: &mut GaussianStats, traj: &Trajectory, gamma: ArrayView2<f64>) {
        let d = self.n_features();
        let mut dev = vec![0.0; d];
        for (frame, g) in traj.frames().zip(gamma.rows()) {
            for (state, &w) in g.iter().enumerate() {
                if w == 0.0 {
                    continue;
                }
                let mean = self.means.row(state);
                for i in 0..d {
                    dev[i] = frame[i] - mean[i];
                }
                stats.weights[state] += w;
                for i in 0..d {
                    stats.first[[state, i]] += w * dev[i];
                }
                match &mut stats.second {
                    SecondMoment::Diagonal(sq) => {
                        for i in 0..d {
                            sq[[state, i]] += w * dev[i] * dev[i];
                        }
                    }
                    SecondMoment::Full(outer) => {
                        for i in 0..d {
                            for j in 0..d {
                                outer[[state, i, j]] += w * dev[i] * dev[j];
                            }
                        }
                    }
                }
            }
        }
    }

    fn merge_stats(mut a: GaussianStats, b: GaussianStats) -> GaussianStats {
        a.weights += &b.weights;
        a.first += &b.first;
        match (&mut a.second, b.second) {
            (SecondMoment::Diagonal(x), SecondMoment::Diagonal(y)) => *x += &y,
            (SecondMoment::Full(x), SecondMoment::Full(y)) => *x += &y,
            // Both sides come from `empty_stats` of one model.
            _ => {}
        }
        a
    }

    /// Weighted means, and covariances projected onto `Σ ⪰ min_covar · I`.
    ///
    /// For the diagonal case the projection clamps each variance; for the
    /// full case it clamps the eigenvalues of the weighted scatter matrix.
    /// Both are the exact constrained maximisers, so EM stays monotone.
    fn m_step(&self, stats: &GaussianStats, iteration: usize) -> Result<Gaussian, HmmError> {
        let (k, d) = self.means.dim();
        if let Some(state) = stats.weights.iter().position(|&w| !(w > MIN_OCCUPANCY)) {
            return Err(HmmError::numerical(
                iteration,
                format!("state {state} has zero occupancy"),
            ));
        }
        let w = stats.weights.view().insert_axis(Axis(1));
        // Shift of the new means away from the accumulation centre.
        let shift = &stats.first / &w;
        let means = &self.means + &shift;
        let floor = self.min_covar;

        let covariances = match &stats.second {
            SecondMoment::Diagonal(sq) => {
                let var = sq / &w - &shift * &shift;
                Covariances::Diagonal(var.mapv(|v| v.max(floor)))
            }
            SecondMoment::Full(outer) => {
                let mut cov = Array3::<f64>::zeros((k, d, d));
                for state in 0..k {
                    let delta = shift.row(state);
                    let wk = stats.weights[state];
                    let scatter = DMatrix::from_fn(d, d, |i, j| {
                        let sij = outer[[state, i, j]] / wk - delta[i] * delta[j];
                        let sji = outer[[state, j, i]] / wk - delta[j] * delta[i];
                        0.5 * (sij + sji)
                    });
                    let mut eigen = SymmetricEigen::new(scatter);
                    eigen.eigenvalues.apply(|v| *v = v.max(floor));
                    let projected = eigen.recompose();
                    cov.slice_mut(s![state, .., ..])
                        .assign(&Array2::from_shape_fn((d, d), |(i, j)| projected[(i, j)]));
                }
                Covariances::Full(cov)
            }
        };

        Self::factorize(means, covariances, floor).map_err(|reason| HmmError::numerical(iteration, reason))
    }
}
