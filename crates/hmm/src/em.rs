//! Baum-Welch expectation-maximisation, generic over the emission family.
//!
//! Each iteration runs the forward-backward pass on every trajectory in
//! parallel, reduces the per-trajectory statistics, then updates all
//! parameters in closed form. The recorded log-likelihood is the one of the
//! parameters entering the E-step, so the trace is non-decreasing.

use msmkit_core::{Trajectory, check_common_features};
use msmkit_msm::{
    TransitionEstimator, TransitionMatrix, estimate_transition_matrix, reversible_fixed_point,
};
use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::HmmConfig;
use crate::emission::Emission;
use crate::error::HmmError;
use crate::forward_backward;
use crate::model::{FitReport, FitStatus, Hmm};

/// Tolerance of the reversible transition estimator inside the M-step.
const TRANSITION_TOL: f64 = 1e-10;

/// Iteration cap of the reversible transition estimator inside the M-step.
const TRANSITION_MAX_ITER: usize = 10_000;

/// Checks the training set and returns its feature count.
pub(crate) fn check_training_data(data: &[Trajectory], n_states: usize) -> Result<usize, HmmError> {
    if data.is_empty() {
        return Err(HmmError::EmptyData);
    }
    let n_features = check_common_features(data).map_err(|e| match e {
        msmkit_core::CoreError::DimensionMismatch { row, expected, got } => {
            HmmError::DimensionMismatch {
                trajectory: row,
                expected,
                got,
            }
        }
        other => HmmError::Core(other),
    })?;
    let n_frames: usize = data.iter().map(Trajectory::n_frames).sum();
    if n_frames < n_states {
        return Err(HmmError::TooFewFrames { n_frames, n_states });
    }
    Ok(n_features)
}

/// Transition matrix with `persistence` on the diagonal and the remainder
/// spread evenly off it.
pub(crate) fn initial_transitions(n_states: usize, persistence: f64) -> Result<TransitionMatrix, HmmError> {
    if n_states == 1 {
        return Ok(TransitionMatrix::new(Array2::ones((1, 1)))?);
    }
    let off = (1.0 - persistence) / (n_states - 1) as f64;
    let probs = Array2::from_shape_fn((n_states, n_states), |(i, j)| {
        if i == j { persistence } else { off }
    });
    Ok(TransitionMatrix::new(probs)?)
}

/// Statistics of one E-step, summed over trajectories.
struct Expectations<S> {
    log_likelihood: f64,
    start: Array1<f64>,
    transitions: Array2<f64>,
    emission: S,
}

impl<S> Expectations<S> {
    fn empty<E: Emission<Stats = S>>(emission: &E) -> Self {
        let k = emission.n_states();
        Self {
            log_likelihood: 0.0,
            start: Array1::zeros(k),
            transitions: Array2::zeros((k, k)),
            emission: emission.empty_stats(),
        }
    }

    fn merge<E: Emission<Stats = S>>(mut self, other: Self) -> Self {
        self.log_likelihood += other.log_likelihood;
        self.start += &other.start;
        self.transitions += &other.transitions;
        self.emission = E::merge_stats(self.emission, other.emission);
        self
    }
}

fn expectations<E: Emission>(hmm: &Hmm<E>, data: &[Trajectory]) -> Expectations<E::Stats> {
    let (log_start, log_trans) = hmm.log_parameters();
    let emission = hmm.emission();
    data.par_iter()
        .map(|traj| {
            let log_b = emission.log_likelihoods(traj);
            let post = forward_backward::posterior(log_start.view(), log_trans.view(), log_b.view());
            let mut stats = emission.empty_stats();
            if post.log_likelihood.is_finite() {
                emission.accumulate(&mut stats, traj, post.gamma.view());
            }
            Expectations {
                log_likelihood: post.log_likelihood,
                start: post.gamma.row(0).to_owned(),
                transitions: post.xi_sum,
                emission: stats,
            }
        })
        .reduce(|| Expectations::empty(emission), Expectations::merge::<E>)
}

/// Expected complete-data log-likelihood `Σ ξ_ij ln T_ij` of the
/// transition part.
fn transition_objective(xi: ArrayView2<f64>, probs: ArrayView2<f64>) -> f64 {
    xi.iter()
        .zip(probs.iter())
        .filter(|(x, _)| **x > 0.0)
        .map(|(x, p)| x * p.ln())
        .sum()
}

/// Transition update from expected counts.
///
/// The reversible estimator may stop at its iteration cap when one
/// direction carries almost no expected counts; the capped iterate is used
/// unless it scores below the current matrix, so EM stays monotone.
fn update_transitions(
    current: &TransitionMatrix,
    xi: ArrayView2<f64>,
    estimator: TransitionEstimator,
    iteration: usize,
) -> Result<Array2<f64>, HmmError> {
    let failed = |e: msmkit_msm::MsmError| {
        HmmError::numerical(iteration, format!("transition update failed: {e}"))
    };
    if estimator != TransitionEstimator::Reversible {
        let (probs, _) =
            estimate_transition_matrix(xi, estimator, 0.0, TRANSITION_TOL, TRANSITION_MAX_ITER)
                .map_err(failed)?;
        return Ok(probs);
    }
    let fit = reversible_fixed_point(xi, TRANSITION_TOL, TRANSITION_MAX_ITER).map_err(failed)?;
    if fit.converged {
        return Ok(fit.transition);
    }
    let capped = transition_objective(xi, fit.transition.view());
    let previous = transition_objective(xi, current.as_array().view());
    let keep_last = capped >= previous;
    warn!(
        iteration,
        max_iter = TRANSITION_MAX_ITER,
        keep_last,
        "reversible transition update hit its iteration cap"
    );
    if keep_last {
        Ok(fit.transition)
    } else {
        Ok(current.as_array().clone())
    }
}

/// Log-likelihood change between two E-steps.
///
/// # Errors
///
/// EM never lowers the likelihood, so a drop beyond round-off is a
/// [`HmmError::NumericalFailure`].
fn improvement(previous: f64, current: f64, iteration: usize) -> Result<f64, HmmError> {
    let delta = current - previous;
    if delta < -1e-8 * previous.abs().max(1.0) {
        return Err(HmmError::numerical(
            iteration,
            format!("log-likelihood decreased from {previous} to {current}"),
        ));
    }
    Ok(delta)
}

fn maximize<E: Emission>(
    current: &Hmm<E>,
    stats: &Expectations<E::Stats>,
    estimator: TransitionEstimator,
    n_sequences: usize,
    iteration: usize,
) -> Result<Hmm<E>, HmmError> {
    let emission = current.emission().m_step(&stats.emission, iteration)?;
    let probs = update_transitions(
        current.transition_matrix(),
        stats.transitions.view(),
        estimator,
        iteration,
    )?;
    let transmat = TransitionMatrix::new(probs)
        .map_err(|e| HmmError::numerical(iteration, format!("transition update failed: {e}")))?;
    let start = &stats.start / n_sequences as f64;
    Hmm::new(transmat, start, emission)
}

/// Runs EM from `emission` until convergence, the iteration cap, or `stop`
/// returning `true` at an iteration boundary.
///
/// The initial transition matrix comes from the configured persistence and
/// the start distribution is uniform.
#[tracing::instrument(skip_all, fields(n_states = config.n_states(), n_sequences = data.len()))]
pub(crate) fn fit_em<E: Emission>(
    data: &[Trajectory],
    emission: E,
    config: &HmmConfig,
    mut stop: impl FnMut() -> bool,
) -> Result<Hmm<E>, HmmError> {
    let k = config.n_states();
    let transmat = initial_transitions(k, config.persistence())?;
    let start = Array1::from_elem(k, 1.0 / k as f64);
    let mut hmm = Hmm::new(transmat, start, emission)?;
    let mut trace: Vec<f64> = Vec::with_capacity(config.max_iter());
    let mut status = FitStatus::MaxIterReached;

    for iteration in 1..=config.max_iter() {
        if stop() {
            status = FitStatus::Stopped;
            break;
        }

        let stats = expectations(&hmm, data);
        let ll = stats.log_likelihood;
        if !ll.is_finite() {
            return Err(HmmError::numerical(iteration, format!("log-likelihood is {ll}")));
        }
        debug!(iteration, log_likelihood = ll, "E-step");

        if let Some(&previous) = trace.last() {
            let delta = improvement(previous, ll, iteration)?;
            trace.push(ll);
            if delta < config.tol() {
                status = FitStatus::Converged;
                break;
            }
        } else {
            trace.push(ll);
        }

        hmm = maximize(&hmm, &stats, config.estimator(), data.len(), iteration)?;
    }

    match status {
        FitStatus::MaxIterReached => warn!(
            max_iter = config.max_iter(),
            "EM reached the iteration cap before converging"
        ),
        FitStatus::Stopped => info!(n_iter = trace.len(), "EM stopped by caller"),
        FitStatus::Converged => info!(
            n_iter = trace.len(),
            log_likelihood = trace.last().copied().unwrap_or(f64::NAN),
            "EM converged"
        ),
    }
    Ok(hmm.with_report(FitReport::new(status, trace)))
}
