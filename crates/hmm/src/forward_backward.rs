//! Log-space forward-backward and Viterbi recursions.
//!
//! All inputs are logarithms: `log_start` (K), `log_trans` (K×K) and the
//! per-frame emission log-likelihoods `log_b` (T×K). Zero probabilities are
//! negative infinity and propagate through `logsumexp` without producing
//! NaN.

use msmkit_core::logsumexp;
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Posterior quantities of one sequence.
#[derive(Debug, Clone)]
pub(crate) struct Posterior {
    /// `ln p(x_{0..T})`.
    pub log_likelihood: f64,
    /// State occupancy `γ_t(k)`, `T × K`.
    pub gamma: Array2<f64>,
    /// Expected transition counts `Σ_t ξ_t(i, j)`, `K × K`.
    pub xi_sum: Array2<f64>,
}

fn forward(log_start: ArrayView1<f64>, log_trans: ArrayView2<f64>, log_b: ArrayView2<f64>) -> Array2<f64> {
    let (n, k) = log_b.dim();
    let mut alpha = Array2::<f64>::from_elem((n, k), f64::NEG_INFINITY);
    for j in 0..k {
        alpha[[0, j]] = log_start[j] + log_b[[0, j]];
    }
    let mut work = vec![0.0; k];
    for t in 1..n {
        for j in 0..k {
            for (i, w) in work.iter_mut().enumerate() {
                *w = alpha[[t - 1, i]] + log_trans[[i, j]];
            }
            alpha[[t, j]] = logsumexp(&work) + log_b[[t, j]];
        }
    }
    alpha
}

fn backward(log_trans: ArrayView2<f64>, log_b: ArrayView2<f64>) -> Array2<f64> {
    let (n, k) = log_b.dim();
    let mut beta = Array2::<f64>::zeros((n, k));
    let mut work = vec![0.0; k];
    for t in (0..n.saturating_sub(1)).rev() {
        for i in 0..k {
            for (j, w) in work.iter_mut().enumerate() {
                *w = log_trans[[i, j]] + log_b[[t + 1, j]] + beta[[t + 1, j]];
            }
            beta[[t, i]] = logsumexp(&work);
        }
    }
    beta
}

/// Log-likelihood of one sequence by the forward recursion alone.
pub(crate) fn log_likelihood(
    log_start: ArrayView1<f64>,
    log_trans: ArrayView2<f64>,
    log_b: ArrayView2<f64>,
) -> f64 {
    let alpha = forward(log_start, log_trans, log_b);
    let last = alpha.row(alpha.nrows() - 1).to_vec();
    logsumexp(&last)
}

/// Full E-step for one sequence.
///
/// When the sequence has zero likelihood under the model the returned
/// `log_likelihood` is negative infinity and `gamma`/`xi_sum` are
/// meaningless; callers must check it before using them.
pub(crate) fn posterior(
    log_start: ArrayView1<f64>,
    log_trans: ArrayView2<f64>,
    log_b: ArrayView2<f64>,
) -> Posterior {
    let (n, k) = log_b.dim();
    let alpha = forward(log_start, log_trans, log_b);
    let beta = backward(log_trans, log_b);
    let last = alpha.row(n - 1).to_vec();
    let ll = logsumexp(&last);

    let mut gamma = &alpha + &beta;
    gamma.mapv_inplace(|v| (v - ll).exp());

    let mut xi_sum = Array2::<f64>::zeros((k, k));
    for t in 0..n.saturating_sub(1) {
        for i in 0..k {
            let a = alpha[[t, i]];
            if a == f64::NEG_INFINITY {
                continue;
            }
            for j in 0..k {
                let v = a + log_trans[[i, j]] + log_b[[t + 1, j]] + beta[[t + 1, j]] - ll;
                xi_sum[[i, j]] += v.exp();
            }
        }
    }

    Posterior {
        log_likelihood: ll,
        gamma,
        xi_sum,
    }
}

/// Most probable state path and its joint log-probability.
///
/// Ties are broken towards the lower state index.
pub(crate) fn viterbi(
    log_start: ArrayView1<f64>,
    log_trans: ArrayView2<f64>,
    log_b: ArrayView2<f64>,
) -> (Vec<usize>, f64) {
    let (n, k) = log_b.dim();
    let mut delta = Array2::<f64>::from_elem((n, k), f64::NEG_INFINITY);
    let mut psi = Array2::<usize>::zeros((n, k));
    for j in 0..k {
        delta[[0, j]] = log_start[j] + log_b[[0, j]];
    }
    for t in 1..n {
        for j in 0..k {
            let mut best = f64::NEG_INFINITY;
            let mut arg = 0;
            for i in 0..k {
                let v = delta[[t - 1, i]] + log_trans[[i, j]];
                if v > best {
                    best = v;
                    arg = i;
                }
            }
            delta[[t, j]] = best + log_b[[t, j]];
            psi[[t, j]] = arg;
        }
    }

    let mut state = 0;
    let mut best = f64::NEG_INFINITY;
    for j in 0..k {
        if delta[[n - 1, j]] > best {
            best = delta[[n - 1, j]];
            state = j;
        }
    }
    let mut path = vec![0; n];
    path[n - 1] = state;
    for t in (1..n).rev() {
        state = psi[[t, state]];
        path[t - 1] = state;
    }
    (path, best)
}
