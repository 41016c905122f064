//! Distance metrics between frames.
//!
//! A [`Metric`] maps two equal-length feature vectors to a non-negative,
//! symmetric distance. Batch evaluation against one target goes through
//! [`Metric::distances_to`], which [`Euclidean`] specialises for 1D and 2D
//! frames.

use std::f64::consts::TAU;

use crate::error::ClusterError;

/// A symmetric, non-negative distance between feature vectors.
pub trait Metric: Clone + Send + Sync + std::fmt::Debug {
    /// Distance between `a` and `b` (same length).
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Distances from `target` to every row of the row-major `frames`.
    ///
    /// `out.len()` must equal `frames.len() / target.len()`.
    fn distances_to(&self, frames: &[f64], target: &[f64], out: &mut [f64]) {
        let n_features = target.len();
        debug_assert_eq!(frames.len(), out.len() * n_features);
        for (o, row) in out.iter_mut().zip(frames.chunks_exact(n_features)) {
            *o = self.distance(row, target);
        }
    }

    /// Checks the metric's own parameters.
    fn validate(&self) -> Result<(), ClusterError> {
        Ok(())
    }
}

/// Plain Euclidean distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Euclidean;

impl Metric for Euclidean {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    fn distances_to(&self, frames: &[f64], target: &[f64], out: &mut [f64]) {
        match target.len() {
            1 => sq_dist_1d(frames, target[0], out),
            2 => sq_dist_2d(frames, target, out),
            n => sq_dist_nd(frames, n, target, out),
        }
        for o in out.iter_mut() {
            *o = o.sqrt();
        }
    }
}

#[inline]
fn sq_dist_1d(frames: &[f64], target: f64, out: &mut [f64]) {
    for (o, &c) in out.iter_mut().zip(frames.iter()) {
        let d = c - target;
        *o = d * d;
    }
}

#[inline]
fn sq_dist_2d(frames: &[f64], target: &[f64], out: &mut [f64]) {
    let (t0, t1) = (target[0], target[1]);
    for (o, row) in out.iter_mut().zip(frames.chunks_exact(2)) {
        let d0 = row[0] - t0;
        let d1 = row[1] - t1;
        *o = d0 * d0 + d1 * d1;
    }
}

#[inline]
fn sq_dist_nd(frames: &[f64], n_features: usize, target: &[f64], out: &mut [f64]) {
    for (o, row) in out.iter_mut().zip(frames.chunks_exact(n_features)) {
        let mut acc = 0.0;
        for j in 0..n_features {
            let d = row[j] - target[j];
            acc += d * d;
        }
        *o = acc;
    }
}

/// Manhattan (L1) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Manhattan;

impl Metric for Manhattan {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }
}

/// Euclidean distance under minimum-image convention on a periodic domain.
///
/// Each coordinate difference is wrapped to `[0, period / 2]` before
/// squaring, so angles `-π + ε` and `π - ε` are `2ε` apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodic {
    period: f64,
}

impl Periodic {
    /// Creates a periodic metric with the given period.
    pub fn new(period: f64) -> Self {
        Self { period }
    }

    /// Returns the period.
    pub fn period(&self) -> f64 {
        self.period
    }

    #[inline]
    fn wrapped(&self, d: f64) -> f64 {
        let d = d.abs().rem_euclid(self.period);
        d.min(self.period - d)
    }
}

impl Default for Periodic {
    /// Period 2π, for angular features in radians.
    fn default() -> Self {
        Self::new(TAU)
    }
}

impl Metric for Periodic {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| {
                let d = self.wrapped(x - y);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    fn validate(&self) -> Result<(), ClusterError> {
        if !self.period.is_finite() || self.period <= 0.0 {
            return Err(ClusterError::InvalidPeriod {
                period: self.period,
            });
        }
        Ok(())
    }
}

/// Runtime choice among the built-in metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MetricKind {
    /// See [`Euclidean`].
    #[default]
    Euclidean,
    /// See [`Manhattan`].
    Manhattan,
    /// See [`Periodic`].
    Periodic(Periodic),
}

impl Metric for MetricKind {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean => Euclidean.distance(a, b),
            Self::Manhattan => Manhattan.distance(a, b),
            Self::Periodic(p) => p.distance(a, b),
        }
    }

    fn distances_to(&self, frames: &[f64], target: &[f64], out: &mut [f64]) {
        match self {
            Self::Euclidean => Euclidean.distances_to(frames, target, out),
            Self::Manhattan => Manhattan.distances_to(frames, target, out),
            Self::Periodic(p) => p.distances_to(frames, target, out),
        }
    }

    fn validate(&self) -> Result<(), ClusterError> {
        match self {
            Self::Periodic(p) => p.validate(),
            _ => Ok(()),
        }
    }
}

/// Index and distance of the nearest row of `centroids` to `frame`.
///
/// Ties go to the lowest index. Returns `None` if `centroids` is empty.
pub(crate) fn nearest<M: Metric>(
    metric: &M,
    centroids: &[f64],
    n_features: usize,
    frame: &[f64],
) -> Option<(usize, f64)> {
    centroids
        .chunks_exact(n_features)
        .map(|c| metric.distance(frame, c))
        .enumerate()
        .fold(None, |best, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
}
