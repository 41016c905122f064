//! Eigenvalues and implied timescales of reversible transition matrices.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array1;

use crate::error::MsmError;
use crate::transition::TransitionMatrix;

/// Largest detailed-balance violation tolerated by [`eigenvalues`].
pub const DETAILED_BALANCE_TOLERANCE: f64 = 1e-8;

/// Eigenvalues of a reversible `T`, sorted in descending order.
///
/// Uses the symmetric similarity transform `S = D^{1/2} T D^{-1/2}` with
/// `D = diag(π)`, whose spectrum equals that of `T` and which a symmetric
/// solver handles exactly.
///
/// # Errors
///
/// - [`MsmError::NotReversible`] if `T` violates detailed balance with
///   respect to `pi` by more than [`DETAILED_BALANCE_TOLERANCE`].
/// - [`MsmError::NumericalFailure`] if some `π_i` is zero.
pub fn eigenvalues(t: &TransitionMatrix, pi: &Array1<f64>) -> Result<Array1<f64>, MsmError> {
    let violation = t.detailed_balance_violation(pi.view());
    if violation > DETAILED_BALANCE_TOLERANCE {
        return Err(MsmError::NotReversible {
            max_violation: violation,
        });
    }
    if let Some(i) = pi.iter().position(|&p| !(p > 0.0)) {
        return Err(MsmError::NumericalFailure {
            iterations: 0,
            reason: format!("stationary probability of state {i} is zero"),
        });
    }
    let n = t.n_states();
    let sqrt_pi = pi.mapv(f64::sqrt);
    let s = DMatrix::from_fn(n, n, |i, j| sqrt_pi[i] * t.prob(i, j) / sqrt_pi[j]);
    // Only the lower triangle is read; round-off asymmetry is harmless.
    let eigen = SymmetricEigen::new(s);
    let mut values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    values.sort_by(|a, b| b.total_cmp(a));
    Ok(Array1::from(values))
}

/// Implied timescales `−lag / ln|λ_k|` for every eigenvalue after the first.
///
/// Eigenvalues with `|λ| >= 1` map to infinity.
pub fn implied_timescales(eigenvalues: &Array1<f64>, lag: usize) -> Array1<f64> {
    eigenvalues
        .iter()
        .skip(1)
        .map(|&l| {
            let a = l.abs();
            if a >= 1.0 {
                f64::INFINITY
            } else {
                -(lag as f64) / a.ln()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_two_state_spectrum() {
        // Eigenvalues of [[1-a, a], [b, 1-b]] are 1 and 1 - a - b.
        let t = TransitionMatrix::new(array![[0.9, 0.1], [0.2, 0.8]]).unwrap();
        let pi = t.stationary_distribution().unwrap();
        let ev = eigenvalues(&t, &pi).unwrap();
        assert_abs_diff_eq!(ev[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ev[1], 0.7, epsilon = 1e-12);

        let ts = implied_timescales(&ev, 5);
        assert_eq!(ts.len(), 1);
        assert_abs_diff_eq!(ts[0], -5.0 / 0.7_f64.ln(), epsilon = 1e-9);
    }

    #[test]
    fn test_three_state_spectrum_is_descending() {
        // Symmetric T with uniform π: eigenvalues 1, 0.25, 0.25.
        let t = TransitionMatrix::new(array![
            [0.5, 0.25, 0.25],
            [0.25, 0.5, 0.25],
            [0.25, 0.25, 0.5]
        ])
        .unwrap();
        let pi = t.stationary_distribution().unwrap();
        assert_abs_diff_eq!(pi[1], 1.0 / 3.0, epsilon = 1e-12);
        let ev = eigenvalues(&t, &pi).unwrap();
        assert_abs_diff_eq!(ev[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ev[1], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(ev[2], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_irreversible_rejected() {
        let t = TransitionMatrix::new(array![
            [0.1, 0.8, 0.1],
            [0.1, 0.1, 0.8],
            [0.8, 0.1, 0.1]
        ])
        .unwrap();
        let pi = t.stationary_distribution().unwrap();
        assert!(matches!(
            eigenvalues(&t, &pi),
            Err(MsmError::NotReversible { .. })
        ));
    }

    #[test]
    fn test_timescale_edge_values() {
        let ts = implied_timescales(&array![1.0, 1.0, 0.0, -0.5], 2);
        assert_eq!(ts[0], f64::INFINITY);
        assert_eq!(ts[1], 0.0);
        assert_abs_diff_eq!(ts[2], -2.0 / 0.5_f64.ln(), epsilon = 1e-12);
    }
}
