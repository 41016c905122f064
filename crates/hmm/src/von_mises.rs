//! Von Mises emissions for angular features.
//!
//! Each feature of each state has an independent von Mises density
//!
//! ```text
//! f(x | μ, κ) = exp(κ cos(x − μ)) / (2π I0(κ))
//! ```
//!
//! The M-step takes `μ` from the direction of the γ-weighted resultant and
//! `κ = A⁻¹(R̄)` from its mean length through the shared spline table.

use std::f64::consts::{PI, TAU};

use msmkit_cluster::{KCenters, Periodic};
use msmkit_core::{Estimator, Trajectory, numeric};
use msmkit_spline::{KAPPA_MAX, KAPPA_MIN, inverse_bessel_ratio, log_i0};
use ndarray::{Array1, Array2, ArrayView2};

use crate::config::HmmConfig;
use crate::emission::Emission;
use crate::error::HmmError;
use crate::gaussian::MIN_OCCUPANCY;

/// Von Mises emission parameters for every hidden state.
#[derive(Debug, Clone)]
pub struct VonMises {
    means: Array2<f64>,
    kappas: Array2<f64>,
    log_norm: Array2<f64>,
}

impl VonMises {
    /// Builds emissions from `K × D` mean angles and concentrations.
    ///
    /// Means are wrapped into `[−π, π)`.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::InvalidParameters`] if the shapes differ or are
    /// empty, a value is not finite, or a concentration is negative.
    pub fn new(means: Array2<f64>, kappas: Array2<f64>) -> Result<Self, HmmError> {
        let (k, d) = means.dim();
        if k == 0 || d == 0 || kappas.dim() != (k, d) {
            return Err(HmmError::InvalidParameters {
                reason: format!(
                    "means ({k}x{d}) and kappas ({}x{}) must share a non-empty shape",
                    kappas.nrows(),
                    kappas.ncols()
                ),
            });
        }
        if means.iter().chain(kappas.iter()).any(|v| !v.is_finite()) {
            return Err(HmmError::InvalidParameters {
                reason: "parameters contain non-finite values".to_string(),
            });
        }
        if let Some(kappa) = kappas.iter().find(|&&v| v < 0.0) {
            return Err(HmmError::InvalidParameters {
                reason: format!("concentration must be >= 0, got {kappa}"),
            });
        }
        Ok(Self::from_parts(means.mapv(numeric::wrap_angle), kappas))
    }

    fn from_parts(means: Array2<f64>, kappas: Array2<f64>) -> Self {
        let log_norm = kappas.mapv(|kappa| TAU.ln() + log_i0(kappa));
        Self {
            means,
            kappas,
            log_norm,
        }
    }

    /// Initial parameters: k-centers under the periodic metric on strided
    /// frames for the means, `κ = 1` everywhere.
    pub(crate) fn initialize(data: &[Trajectory], config: &HmmConfig) -> Result<Self, HmmError> {
        let strided: Vec<Trajectory> = data.iter().map(|t| t.strided(config.init_stride())).collect();
        let mut kcenters = KCenters::new(config.n_states()).with_metric(Periodic::default());
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
        Ok(Self::from_parts(
            means.mapv(numeric::wrap_angle),
            Array2::ones((k, d)),
        ))
    }

    /// `K × D` mean angles in `[−π, π)`.
    pub fn means(&self) -> &Array2<f64> {
        &self.means
    }

    /// `K × D` concentrations.
    pub fn kappas(&self) -> &Array2<f64> {
        &self.kappas
    }
}

/// Concentration for a mean resultant length.
///
/// Lengths below the tabulated range give `KAPPA_MIN` (the data are
/// effectively uniform); lengths above it are a numerical failure.
fn kappa_from_resultant(r: f64, iteration: usize) -> Result<f64, HmmError> {
    let table = inverse_bessel_ratio()?;
    let (lo, hi) = table.domain();
    if r <= lo {
        return Ok(KAPPA_MIN);
    }
    if r > hi {
        return Err(HmmError::numerical(
            iteration,
            format!("mean resultant length {r} requires a concentration above {KAPPA_MAX}"),
        ));
    }
    Ok(table.invert_kappa(r)?)
}

/// Sufficient statistics for von Mises emissions.
#[derive(Debug, Clone)]
pub struct VonMisesStats {
    weights: Array1<f64>,
    cos: Array2<f64>,
    sin: Array2<f64>,
}

impl Emission for VonMises {
    type Stats = VonMisesStats;

    fn n_states(&self) -> usize {
        self.means.nrows()
    }

    fn n_features(&self) -> usize {
        self.means.ncols()
    }

    fn log_likelihoods(&self, traj: &Trajectory) -> Array2<f64> {
        let k = self.n_states();
        let mut out = Array2::<f64>::zeros((traj.n_frames(), k));
        for (t, frame) in traj.frames().enumerate() {
            for state in 0..k {
                out[[t, state]] = frame
                    .iter()
                    .zip(self.means.row(state))
                    .zip(self.kappas.row(state))
                    .zip(self.log_norm.row(state))
                    .map(|(((x, mu), kappa), norm)| kappa * (x - mu).cos() - norm)
                    .sum();
            }
        }
        out
    }

    fn empty_stats(&self) -> VonMisesStats {
        let (k, d) = self.means.dim();
        VonMisesStats {
            weights: Array1::zeros(k),
            cos: Array2::zeros((k, d)),
            sin: Array2::zeros((k, d)),
        }
    }

    fn accumulate(&self, stats: &mut VonMisesStats, traj: &Trajectory, gamma: ArrayView2<f64>) {
        for (frame, g) in traj.frames().zip(gamma.rows()) {
            for (state, &w) in g.iter().enumerate() {
                if w == 0.0 {
                    continue;
                }
                stats.weights[state] += w;
                for (j, &x) in frame.iter().enumerate() {
                    stats.cos[[state, j]] += w * x.cos();
                    stats.sin[[state, j]] += w * x.sin();
                }
            }
        }
    }

    fn merge_stats(mut a: VonMisesStats, b: VonMisesStats) -> VonMisesStats {
        a.weights += &b.weights;
        a.cos += &b.cos;
        a.sin += &b.sin;
        a
    }

    fn m_step(&self, stats: &VonMisesStats, iteration: usize) -> Result<VonMises, HmmError> {
        let (k, d) = self.means.dim();
        let mut means = Array2::<f64>::zeros((k, d));
        let mut kappas = Array2::<f64>::zeros((k, d));
        for state in 0..k {
            let w = stats.weights[state];
            if !(w > MIN_OCCUPANCY) {
                return Err(HmmError::numerical(
                    iteration,
                    format!("state {state} has zero occupancy"),
                ));
            }
            for j in 0..d {
                let c = stats.cos[[state, j]] / w;
                let s = stats.sin[[state, j]] / w;
                means[[state, j]] = numeric::wrap_angle(s.atan2(c));
                let r = c.hypot(s).min(1.0);
                kappas[[state, j]] = kappa_from_resultant(r, iteration)?;
            }
        }
        Ok(Self::from_parts(means, kappas))
    }
}
