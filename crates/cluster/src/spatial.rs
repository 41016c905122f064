//! Regular-spatial clustering: one pass, distance cutoff.

use msmkit_core::{Estimator, Trajectory};
use tracing::info;

use crate::distance::{Euclidean, Metric, nearest};
use crate::error::ClusterError;
use crate::pooled_features;
use crate::result::Clustering;

/// Regular-spatial clustering.
///
/// Frames are visited once in input order (trajectories in order, frames in
/// order). A frame farther than `d_min` from every existing centroid becomes
/// a new centroid; otherwise it joins its nearest centroid at that moment.
/// Deterministic. Centroids end up pairwise more than `d_min` apart.
#[derive(Debug, Clone)]
pub struct RegularSpatial<M: Metric = Euclidean> {
    d_min: f64,
    metric: M,
}

impl RegularSpatial<Euclidean> {
    /// Creates an estimator with cutoff `d_min` and the Euclidean metric.
    pub fn new(d_min: f64) -> Self {
        Self {
            d_min,
            metric: Euclidean,
        }
    }
}

impl<M: Metric> RegularSpatial<M> {
    /// Replaces the distance metric.
    pub fn with_metric<N: Metric>(self, metric: N) -> RegularSpatial<N> {
        RegularSpatial {
            d_min: self.d_min,
            metric,
        }
    }

    /// Returns the cutoff distance.
    pub fn d_min(&self) -> f64 {
        self.d_min
    }

    /// Returns the metric.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.d_min.is_finite() || self.d_min < 0.0 {
            return Err(ClusterError::InvalidThreshold { d_min: self.d_min });
        }
        self.metric.validate()
    }
}

impl<M: Metric> Estimator<[Trajectory]> for RegularSpatial<M> {
    type Fitted = Clustering<M>;
    type Error = ClusterError;

    /// # Errors
    ///
    /// - [`ClusterError::InvalidThreshold`] if `d_min` is negative or non-finite.
    /// - [`ClusterError::EmptyData`] if `data` is empty.
    /// - [`ClusterError::DimensionMismatch`] if feature counts differ.
    #[tracing::instrument(skip(self, data), fields(d_min = self.d_min, n_trajectories = data.len()))]
    fn fit(&self, data: &[Trajectory]) -> Result<Clustering<M>, ClusterError> {
        self.validate()?;
        let n_features = pooled_features(data)?;

        let mut centroids: Vec<f64> = Vec::new();
        let mut labels = Vec::with_capacity(data.len());
        let mut distances = Vec::with_capacity(data.len());

        for traj in data {
            let mut seq_labels = Vec::with_capacity(traj.n_frames());
            let mut seq_dists = Vec::with_capacity(traj.n_frames());
            for frame in traj.frames() {
                match nearest(&self.metric, &centroids, n_features, frame) {
                    Some((idx, d)) if d <= self.d_min => {
                        seq_labels.push(idx);
                        seq_dists.push(d);
                    }
                    _ => {
                        seq_labels.push(centroids.len() / n_features);
                        seq_dists.push(0.0);
                        centroids.extend_from_slice(frame);
                    }
                }
            }
            labels.push(seq_labels);
            distances.push(seq_dists);
        }

        let centroids = Trajectory::new(centroids, n_features)?;
        info!(n_clusters = centroids.n_frames(), "regular-spatial complete");
        Ok(Clustering::new(centroids, labels, distances, self.metric.clone()))
    }
}
