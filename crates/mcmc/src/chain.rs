//! Markov chain states and Metropolis moves over transition matrices.
//!
//! Both chains use a flat prior on the free parameters restricted to the
//! sparsity pattern of the counts, so entries with no observed transitions
//! stay exactly zero. Each move transfers a uniform amount of mass
//! `δ ~ U(−s, s)` between two parameters, which is a symmetric proposal, and
//! is accepted with probability `min(1, L'/L)` for the multinomial
//! likelihood `L = Π T_ij^C_ij`. Proposals that would make a parameter
//! non-positive are rejected outright.

use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// Outcome of one Metropolis move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Accepted,
    Rejected,
    /// The chain has fewer than two free parameters; nothing to propose.
    Frozen,
}

/// Reversible chain on the symmetric flux matrix `X`, `T_ij = X_ij / x_i`.
///
/// Parameters are the upper-triangle entries `u_k` on the support
/// `{(i, j) : i <= j, C_ij + C_ji > 0}`. A transfer keeps `Σ X` fixed:
/// off-diagonal entries appear twice in `X` and receive `δ/2`.
#[derive(Debug, Clone)]
pub(crate) struct FluxChain {
    counts: Array2<f64>,
    row_counts: Vec<f64>,
    pairs: Vec<(usize, usize)>,
    flux: Array2<f64>,
    flux_rows: Vec<f64>,
}

impl FluxChain {
    /// Starts from the normalised symmetrised counts `(C + Cᵀ) / 2N`.
    pub(crate) fn new(counts: ArrayView2<f64>) -> Self {
        let n = counts.nrows();
        let total = counts.sum();
        let mut flux = Array2::<f64>::zeros((n, n));
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in i..n {
                let c = counts[[i, j]] + counts[[j, i]];
                if c > 0.0 {
                    let v = c / (2.0 * total);
                    flux[[i, j]] = v;
                    flux[[j, i]] = v;
                    pairs.push((i, j));
                }
            }
        }
        let flux_rows = flux.rows().into_iter().map(|r| r.sum()).collect();
        let row_counts = counts.rows().into_iter().map(|r| r.sum()).collect();
        Self {
            counts: counts.to_owned(),
            row_counts,
            pairs,
            flux,
            flux_rows,
        }
    }

    fn row_log_likelihood(&self, i: usize) -> f64 {
        let mut ll = -self.row_counts[i] * self.flux_rows[i].ln();
        for (j, &c) in self.counts.row(i).iter().enumerate() {
            if c > 0.0 {
                ll += c * self.flux[[i, j]].ln();
            }
        }
        ll
    }

    fn set_pair(&mut self, k: usize, value: f64) {
        let (i, j) = self.pairs[k];
        self.flux[[i, j]] = value;
        self.flux[[j, i]] = value;
        self.flux_rows[i] = self.flux.row(i).sum();
        if i != j {
            self.flux_rows[j] = self.flux.row(j).sum();
        }
    }

    fn weight(&self, k: usize) -> f64 {
        let (i, j) = self.pairs[k];
        if i == j { 1.0 } else { 2.0 }
    }

    pub(crate) fn step(&mut self, scale: f64, rng: &mut impl Rng) -> Step {
        let p = self.pairs.len();
        if p < 2 {
            return Step::Frozen;
        }
        let k1 = rng.random_range(0..p);
        let mut k2 = rng.random_range(0..p - 1);
        if k2 >= k1 {
            k2 += 1;
        }
        let delta = rng.random_range(-scale..scale);

        let (a1, b1) = self.pairs[k1];
        let (a2, b2) = self.pairs[k2];
        let old1 = self.flux[[a1, b1]];
        let old2 = self.flux[[a2, b2]];
        let new1 = old1 + delta / self.weight(k1);
        let new2 = old2 - delta / self.weight(k2);
        if !(new1 > 0.0 && new2 > 0.0) {
            return Step::Rejected;
        }

        let mut rows = vec![a1, b1, a2, b2];
        rows.sort_unstable();
        rows.dedup();
        let before: f64 = rows.iter().map(|&r| self.row_log_likelihood(r)).sum();
        self.set_pair(k1, new1);
        self.set_pair(k2, new2);
        let after: f64 = rows.iter().map(|&r| self.row_log_likelihood(r)).sum();

        let log_u: f64 = rng.random::<f64>().ln();
        if log_u < after - before {
            Step::Accepted
        } else {
            self.set_pair(k1, old1);
            self.set_pair(k2, old2);
            Step::Rejected
        }
    }

    pub(crate) fn transition_matrix(&self) -> Array2<f64> {
        let mut t = self.flux.clone();
        for (i, mut row) in t.rows_mut().into_iter().enumerate() {
            row /= self.flux_rows[i];
        }
        t
    }
}

/// Non-reversible chain with independent rows of `T`.
///
/// Row `i` is free on `{j : C_ij > 0}`; a move transfers probability between
/// two entries of one row.
#[derive(Debug, Clone)]
pub(crate) struct RowChain {
    counts: Array2<f64>,
    support: Vec<Vec<usize>>,
    movable: Vec<usize>,
    probs: Array2<f64>,
}

impl RowChain {
    /// Starts from the row-normalised counts.
    pub(crate) fn new(counts: ArrayView2<f64>) -> Self {
        let support: Vec<Vec<usize>> = counts
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, c)| **c > 0.0)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect();
        let movable = support
            .iter()
            .enumerate()
            .filter(|(_, s)| s.len() >= 2)
            .map(|(i, _)| i)
            .collect();
        Self {
            counts: counts.to_owned(),
            support,
            movable,
            probs: msmkit_msm::row_normalize(counts),
        }
    }

    pub(crate) fn step(&mut self, scale: f64, rng: &mut impl Rng) -> Step {
        if self.movable.is_empty() {
            return Step::Frozen;
        }
        let i = self.movable[rng.random_range(0..self.movable.len())];
        let support = &self.support[i];
        let m = support.len();
        let s1 = rng.random_range(0..m);
        let mut s2 = rng.random_range(0..m - 1);
        if s2 >= s1 {
            s2 += 1;
        }
        let (j1, j2) = (support[s1], support[s2]);
        let delta = rng.random_range(-scale..scale);

        let old1 = self.probs[[i, j1]];
        let old2 = self.probs[[i, j2]];
        let new1 = old1 + delta;
        let new2 = old2 - delta;
        if !(new1 > 0.0 && new2 > 0.0) {
            return Step::Rejected;
        }
        let log_ratio = self.counts[[i, j1]] * (new1 / old1).ln()
            + self.counts[[i, j2]] * (new2 / old2).ln();

        let log_u: f64 = rng.random::<f64>().ln();
        if log_u < log_ratio {
            self.probs[[i, j1]] = new1;
            self.probs[[i, j2]] = new2;
            Step::Accepted
        } else {
            Step::Rejected
        }
    }

    pub(crate) fn transition_matrix(&self) -> Array2<f64> {
        // Renormalise to absorb round-off from repeated transfers.
        msmkit_msm::row_normalize(self.probs.view())
    }
}
