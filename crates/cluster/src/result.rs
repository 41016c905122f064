//! Output type of a clustering run.

use msmkit_core::{Fitted, Trajectory};
use rayon::prelude::*;

use crate::distance::{Euclidean, Metric, nearest};
use crate::error::ClusterError;
use crate::pooled_features;

/// One cluster: its centroid and the frames assigned to it during fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    centroid: Vec<f64>,
    members: Vec<(usize, usize)>,
}

impl Cluster {
    /// Centroid feature vector.
    pub fn centroid(&self) -> &[f64] {
        &self.centroid
    }

    /// Member frames as `(trajectory, frame)` index pairs, in input order.
    pub fn members(&self) -> &[(usize, usize)] {
        &self.members
    }

    /// Number of member frames.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no frame was assigned to this cluster.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A fitted clustering.
///
/// Holds the centroids, the metric they were found under and the
/// assignment of every training frame. Centroids never change after
/// construction; [`Clustering::transform`] labels new data against them.
#[derive(Debug, Clone)]
pub struct Clustering<M: Metric = Euclidean> {
    centroids: Trajectory,
    labels: Vec<Vec<usize>>,
    distances: Vec<Vec<f64>>,
    metric: M,
}

impl<M: Metric> Clustering<M> {
    pub(crate) fn new(
        centroids: Trajectory,
        labels: Vec<Vec<usize>>,
        distances: Vec<Vec<f64>>,
        metric: M,
    ) -> Self {
        Self {
            centroids,
            labels,
            distances,
            metric,
        }
    }

    /// Number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.centroids.n_frames()
    }

    /// Number of features per centroid.
    pub fn n_features(&self) -> usize {
        self.centroids.n_features()
    }

    /// Centroids, one per frame of the returned trajectory.
    pub fn centroids(&self) -> &Trajectory {
        &self.centroids
    }

    /// Training labels, one sequence per input trajectory.
    pub fn labels(&self) -> &[Vec<usize>] {
        &self.labels
    }

    /// Distance from each training frame to its assigned centroid.
    pub fn distances(&self) -> &[Vec<f64>] {
        &self.distances
    }

    /// The metric centroids were found under.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Largest distance from a training frame to its assigned centroid.
    pub fn max_radius(&self) -> f64 {
        self.distances
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }

    /// Materialises the clusters with their member frames.
    pub fn clusters(&self) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = self
            .centroids
            .frames()
            .map(|c| Cluster {
                centroid: c.to_vec(),
                members: Vec::new(),
            })
            .collect();
        for (t, seq) in self.labels.iter().enumerate() {
            for (f, &label) in seq.iter().enumerate() {
                clusters[label].members.push((t, f));
            }
        }
        clusters
    }

    /// Assigns every frame to its nearest centroid, returning labels and
    /// distances per trajectory. Trajectories are processed in parallel.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::EmptyData`] if `data` is empty.
    /// - [`ClusterError::DimensionMismatch`] if a trajectory's feature count
    ///   differs from the centroids'.
    pub fn assign(
        &self,
        data: &[Trajectory],
    ) -> Result<(Vec<Vec<usize>>, Vec<Vec<f64>>), ClusterError> {
        let n_features = pooled_features(data)?;
        if n_features != self.n_features() {
            return Err(ClusterError::DimensionMismatch {
                trajectory: 0,
                expected: self.n_features(),
                got: n_features,
            });
        }
        let centroids = self.centroids.as_slice();
        let assigned: Vec<(Vec<usize>, Vec<f64>)> = data
            .par_iter()
            .map(|traj| {
                let (labels, dists): (Vec<usize>, Vec<f64>) = traj
                    .frames()
                    .map(|frame| {
                        nearest(&self.metric, centroids, n_features, frame)
                            .unwrap_or((0, f64::INFINITY))
                    })
                    .unzip();
                (labels, dists)
            })
            .collect();
        Ok(assigned.into_iter().unzip())
    }
}

impl<M: Metric> Fitted<[Trajectory]> for Clustering<M> {
    type Output = Vec<Vec<usize>>;
    type Error = ClusterError;

    /// Nearest-centroid labels for each frame of each trajectory.
    fn transform(&self, data: &[Trajectory]) -> Result<Vec<Vec<usize>>, ClusterError> {
        self.assign(data).map(|(labels, _)| labels)
    }

    /// Negative inertia: minus the sum of squared distances to the nearest
    /// centroid.
    fn score(&self, data: &[Trajectory]) -> Result<f64, ClusterError> {
        let (_, distances) = self.assign(data)?;
        Ok(-distances.iter().flatten().map(|d| d * d).sum::<f64>())
    }
}
