//! Row-stochastic transition matrices.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1};

use crate::counts::CountMatrix;
use crate::error::MsmError;

/// Tolerance on row sums accepted by [`TransitionMatrix::new`].
pub const ROW_SUM_TOLERANCE: f64 = 1e-8;

/// A K×K row-stochastic transition matrix.
///
/// Row `i` holds the probabilities of moving from state `i` to every state
/// after one lag time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    probs: Array2<f64>,
}

impl TransitionMatrix {
    /// Wraps `probs` after checking it is row-stochastic.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::InvalidTransitionMatrix`] if the matrix is empty,
    /// not square, has entries outside `[0, 1]` or non-finite, or a row sum
    /// differs from 1 by more than [`ROW_SUM_TOLERANCE`].
    pub fn new(probs: Array2<f64>) -> Result<Self, MsmError> {
        let tm = Self { probs };
        tm.validate()?;
        Ok(tm)
    }

    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.probs.nrows()
    }

    /// Probability of `from → to`.
    pub fn prob(&self, from: usize, to: usize) -> f64 {
        self.probs[[from, to]]
    }

    /// Transition probabilities out of `from`.
    pub fn row(&self, from: usize) -> ArrayView1<'_, f64> {
        self.probs.row(from)
    }

    /// The full probability matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.probs
    }

    /// Consumes the wrapper, returning the matrix.
    pub fn into_inner(self) -> Array2<f64> {
        self.probs
    }

    /// Validates that the matrix is row-stochastic.
    pub fn validate(&self) -> Result<(), MsmError> {
        let (r, c) = self.probs.dim();
        if r == 0 || r != c {
            return Err(MsmError::InvalidTransitionMatrix {
                reason: format!("expected a non-empty square matrix, got {r}x{c}"),
            });
        }
        for (i, row) in self.probs.rows().into_iter().enumerate() {
            let mut sum = 0.0;
            for (j, &p) in row.iter().enumerate() {
                if !p.is_finite() {
                    return Err(MsmError::InvalidTransitionMatrix {
                        reason: format!("probs[{i}][{j}] is not finite: {p}"),
                    });
                }
                if !(0.0..=1.0).contains(&p) {
                    return Err(MsmError::InvalidTransitionMatrix {
                        reason: format!("probs[{i}][{j}] = {p} is outside [0, 1]"),
                    });
                }
                sum += p;
            }
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(MsmError::InvalidTransitionMatrix {
                    reason: format!("row {i} sums to {sum}, expected 1"),
                });
            }
        }
        Ok(())
    }

    /// Samples the next state from `from` by walking the row's cumulative
    /// distribution. Falls back to the last state with positive probability
    /// when rounding leaves the draw uncovered.
    pub fn sample(&self, from: usize, rng: &mut impl rand::Rng) -> usize {
        let u: f64 = rng.random();
        let row = self.probs.row(from);
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        for (state, &p) in row.iter().enumerate() {
            if p > 0.0 {
                last_positive = state;
            }
            cumulative += p;
            if cumulative > u && p > 0.0 {
                return state;
            }
        }
        last_positive
    }

    /// Stationary distribution `π` with `πT = π`, `Σπ = 1`.
    ///
    /// Solved directly as a linear system (one balance equation replaced by
    /// the normalisation), so periodic chains are handled. Round-off
    /// negatives are clamped to zero before renormalising.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::NumericalFailure`] if the system is singular,
    /// which happens when the chain has more than one closed class.
    pub fn stationary_distribution(&self) -> Result<Array1<f64>, MsmError> {
        let n = self.n_states();
        if n == 1 {
            return Ok(Array1::ones(1));
        }
        // Rows 0..n-1 hold (Tᵀ − I)π = 0; the last row is Σπ = 1.
        let a = DMatrix::from_fn(n, n, |i, j| {
            if i == n - 1 {
                1.0
            } else if i == j {
                self.probs[[j, i]] - 1.0
            } else {
                self.probs[[j, i]]
            }
        });
        let mut b = DVector::<f64>::zeros(n);
        b[n - 1] = 1.0;

        let x = a.lu().solve(&b).ok_or_else(|| MsmError::NumericalFailure {
            iterations: 0,
            reason: "stationary system is singular".to_string(),
        })?;
        let mut pi = Array1::from_iter(x.iter().copied());
        pi.mapv_inplace(|v| v.max(0.0));
        let total = pi.sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(MsmError::NumericalFailure {
                iterations: 0,
                reason: format!("stationary distribution has total mass {total}"),
            });
        }
        pi /= total;
        Ok(pi)
    }

    /// Largest detailed-balance violation `max |π_i T_ij − π_j T_ji|`.
    pub fn detailed_balance_violation(&self, pi: ArrayView1<f64>) -> f64 {
        let n = self.n_states();
        let mut worst = 0.0_f64;
        for i in 0..n {
            for j in (i + 1)..n {
                let flux = pi[i] * self.probs[[i, j]] - pi[j] * self.probs[[j, i]];
                worst = worst.max(flux.abs());
            }
        }
        worst
    }

    /// Log-likelihood `Σ C_ij ln T_ij` of a count matrix under this chain.
    ///
    /// Terms with `C_ij = 0` contribute nothing; a positive count on a zero
    /// probability gives negative infinity.
    pub fn log_likelihood(&self, counts: &CountMatrix) -> f64 {
        let mut ll = 0.0;
        for ((i, j), &c) in counts.as_array().indexed_iter() {
            if c > 0 {
                ll += c as f64 * self.probs[[i, j]].ln();
            }
        }
        ll
    }
}
