//! Transition matrix estimators working on (possibly fractional) counts.
//!
//! All functions take `f64` counts so the HMM M-step can feed expected
//! transition counts through the same code as integer MSM counts.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::{debug, warn};

use crate::error::MsmError;

/// How a transition matrix is estimated from counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitionEstimator {
    /// Maximum-likelihood estimate subject to detailed balance.
    #[default]
    Reversible,
    /// Row-normalised symmetrised counts `C + Cᵀ`.
    Transpose,
    /// Row-normalised counts (unconstrained maximum likelihood).
    NonReversible,
}

/// Divides each row by its sum. Rows summing to zero become uniform.
pub fn row_normalize(counts: ArrayView2<f64>) -> Array2<f64> {
    let n = counts.ncols();
    let mut t = counts.to_owned();
    for mut row in t.rows_mut() {
        let s = row.sum();
        if s > 0.0 {
            row /= s;
        } else {
            row.fill(1.0 / n as f64);
        }
    }
    t
}

/// Row-normalised `C + Cᵀ`.
pub fn transpose_estimate(counts: ArrayView2<f64>) -> Array2<f64> {
    let sym = &counts + &counts.t();
    row_normalize(sym.view())
}

/// Outcome of the reversible fixed-point iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReversibleFit {
    /// Last iterate. Every iterate is row-stochastic and in detailed
    /// balance, converged or not.
    pub transition: Array2<f64>,
    /// Iterations run.
    pub iterations: usize,
    /// Whether `max |ΔT|` dropped below the tolerance.
    pub converged: bool,
}

/// Reversible maximum-likelihood transition matrix.
///
/// Fixed-point iteration on the symmetric flux matrix `X`, starting from
/// `X = C + Cᵀ`:
///
/// ```text
/// x_i  = Σ_j X_ij,  c_i = Σ_j C_ij
/// X_ij ← (C_ij + C_ji) / (c_i / x_i + c_j / x_j)
/// T_ij = X_ij / x_i
/// ```
///
/// Stops when `max |ΔT| < tol`. Returns the matrix and the number of
/// iterations used.
///
/// # Errors
///
/// - [`MsmError::InvalidConfig`] if `counts` is not square or has a row
///   with no counts.
/// - [`MsmError::NumericalFailure`] if the iteration produces non-finite
///   values or does not converge within `max_iter` iterations.
#[tracing::instrument(skip(counts), fields(n_states = counts.nrows()))]
pub fn reversible_mle(
    counts: ArrayView2<f64>,
    tol: f64,
    max_iter: usize,
) -> Result<(Array2<f64>, usize), MsmError> {
    let fit = reversible_fixed_point(counts, tol, max_iter)?;
    if !fit.converged {
        warn!(max_iter, "reversible MLE did not converge");
        return Err(MsmError::NumericalFailure {
            iterations: max_iter,
            reason: format!("reversible estimator did not converge to tol = {tol}"),
        });
    }
    Ok((fit.transition, fit.iterations))
}

/// The iteration behind [`reversible_mle`], returning the last iterate
/// instead of failing when `max_iter` is reached.
///
/// Counts with a near-empty direction drive the flux towards the boundary,
/// where convergence is sublinear; callers that only need an improving
/// update can use the capped iterate.
///
/// # Errors
///
/// Same as [`reversible_mle`], except that hitting `max_iter` is reported
/// through [`ReversibleFit::converged`].
pub fn reversible_fixed_point(
    counts: ArrayView2<f64>,
    tol: f64,
    max_iter: usize,
) -> Result<ReversibleFit, MsmError> {
    let (n, m) = counts.dim();
    if n != m {
        return Err(MsmError::InvalidConfig {
            reason: format!("count matrix must be square, got {n}x{m}"),
        });
    }
    let c_row: Array1<f64> = counts.sum_axis(Axis(1));
    if let Some(i) = c_row.iter().position(|&c| !(c > 0.0)) {
        return Err(MsmError::InvalidConfig {
            reason: format!("state {i} has no outgoing counts"),
        });
    }

    let c_sym = &counts + &counts.t();
    let mut x = c_sym.clone();
    let mut t = row_normalize(x.view());

    for iter in 1..=max_iter {
        let x_row: Array1<f64> = x.sum_axis(Axis(1));
        let ratio: Array1<f64> = &c_row / &x_row;
        for i in 0..n {
            for j in 0..n {
                let denom = ratio[i] + ratio[j];
                x[[i, j]] = if c_sym[[i, j]] > 0.0 {
                    c_sym[[i, j]] / denom
                } else {
                    0.0
                };
            }
        }
        let x_row: Array1<f64> = x.sum_axis(Axis(1));
        let mut delta = 0.0_f64;
        let mut next = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let v = x[[i, j]] / x_row[i];
                delta = delta.max((v - t[[i, j]]).abs());
                next[[i, j]] = v;
            }
        }
        if !delta.is_finite() || next.iter().any(|v| !v.is_finite()) {
            return Err(MsmError::NumericalFailure {
                iterations: iter,
                reason: "reversible estimator produced non-finite values".to_string(),
            });
        }
        t = next;
        if delta < tol {
            debug!(iterations = iter, delta, "reversible MLE converged");
            return Ok(ReversibleFit {
                transition: t,
                iterations: iter,
                converged: true,
            });
        }
    }

    Ok(ReversibleFit {
        transition: t,
        iterations: max_iter,
        converged: false,
    })
}

/// Estimates a transition matrix from `counts` with `estimator`, adding
/// `prior` to every count first.
///
/// Returns the matrix and the iteration count (always 0 for the closed-form
/// estimators).
pub fn estimate_transition_matrix(
    counts: ArrayView2<f64>,
    estimator: TransitionEstimator,
    prior: f64,
    tol: f64,
    max_iter: usize,
) -> Result<(Array2<f64>, usize), MsmError> {
    let smoothed = counts.mapv(|c| c + prior);
    match estimator {
        TransitionEstimator::Reversible => reversible_mle(smoothed.view(), tol, max_iter),
        TransitionEstimator::Transpose => Ok((transpose_estimate(smoothed.view()), 0)),
        TransitionEstimator::NonReversible => Ok((row_normalize(smoothed.view()), 0)),
    }
}
