//! Greedy farthest-point (k-centers) clustering.

use msmkit_core::{Estimator, Trajectory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::distance::{Euclidean, Metric};
use crate::error::ClusterError;
use crate::result::Clustering;
use crate::{pooled_features, split_by_lengths};

/// K-centers clustering (Gonzalez's farthest-point heuristic).
///
/// The first centroid is frame 0 of the pooled data, or a uniformly drawn
/// frame when a seed is set. Each further centroid is the non-centroid frame
/// farthest from its nearest centroid. The resulting maximum radius is at
/// most twice the optimal k-center radius.
///
/// # Example
///
/// ```
/// use msmkit_cluster::KCenters;
/// use msmkit_core::{Estimator, Trajectory};
///
/// let traj = Trajectory::from_scalars(vec![0.0, 0.1, 5.0, 5.1]).unwrap();
/// let clustering = KCenters::new(2).fit(&[traj]).unwrap();
/// assert_eq!(clustering.labels()[0], vec![0, 0, 1, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct KCenters<M: Metric = Euclidean> {
    n_clusters: usize,
    metric: M,
    seed: Option<u64>,
}

impl KCenters<Euclidean> {
    /// Creates a k-centers estimator with `n_clusters` centroids.
    ///
    /// Defaults: Euclidean metric, deterministic start at pooled frame 0.
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            metric: Euclidean,
            seed: None,
        }
    }
}

impl<M: Metric> KCenters<M> {
    /// Replaces the distance metric.
    pub fn with_metric<N: Metric>(self, metric: N) -> KCenters<N> {
        KCenters {
            n_clusters: self.n_clusters,
            metric,
            seed: self.seed,
        }
    }

    /// Draws the first centroid at random from a generator seeded with `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns the requested number of clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Returns the metric.
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Returns the seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if self.n_clusters < 1 {
            return Err(ClusterError::InvalidK {
                k: self.n_clusters,
            });
        }
        self.metric.validate()
    }
}

impl<M: Metric> Estimator<[Trajectory]> for KCenters<M> {
    type Fitted = Clustering<M>;
    type Error = ClusterError;

    /// Runs k-centers on the pooled frames of `data`.
    ///
    /// If `n_clusters` exceeds the number of frames, every frame becomes its
    /// own centroid.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::InvalidK`] if `n_clusters == 0`.
    /// - [`ClusterError::InvalidPeriod`] for a malformed periodic metric.
    /// - [`ClusterError::EmptyData`] if `data` is empty.
    /// - [`ClusterError::DimensionMismatch`] if feature counts differ.
    #[tracing::instrument(skip(self, data), fields(n_clusters = self.n_clusters, n_trajectories = data.len()))]
    fn fit(&self, data: &[Trajectory]) -> Result<Clustering<M>, ClusterError> {
        self.validate()?;
        let n_features = pooled_features(data)?;
        let pooled = Trajectory::concat(data).map_err(ClusterError::from_core)?;
        let n_frames = pooled.n_frames();
        let k = self.n_clusters.min(n_frames);
        let frames = pooled.as_slice();

        let mut next = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed).random_range(0..n_frames),
            None => 0,
        };

        let mut labels = vec![0usize; n_frames];
        let mut dists = vec![f64::INFINITY; n_frames];
        let mut is_center = vec![false; n_frames];
        let mut centers: Vec<usize> = Vec::with_capacity(k);

        for c in 0..k {
            centers.push(next);
            is_center[next] = true;
            let target = pooled.frame(next);
            let metric = &self.metric;

            frames
                .par_chunks_exact(n_features)
                .zip(dists.par_iter_mut())
                .zip(labels.par_iter_mut())
                .for_each(|((frame, d), label)| {
                    let new_d = metric.distance(frame, target);
                    if new_d < *d {
                        *d = new_d;
                        *label = c;
                    }
                });
            labels[next] = c;
            dists[next] = 0.0;

            if c + 1 < k {
                next = farthest_non_center(&dists, &is_center);
                debug!(center = c, radius = dists[next], "k-centers step");
            }
        }

        let mut centroid_data = Vec::with_capacity(k * n_features);
        for &idx in &centers {
            centroid_data.extend_from_slice(pooled.frame(idx));
        }
        let centroids = Trajectory::new(centroid_data, n_features)?;

        let lengths: Vec<usize> = data.iter().map(Trajectory::n_frames).collect();
        let clustering = Clustering::new(
            centroids,
            split_by_lengths(labels, &lengths),
            split_by_lengths(dists, &lengths),
            self.metric.clone(),
        );
        info!(
            n_clusters = k,
            max_radius = clustering.max_radius(),
            "k-centers complete"
        );
        Ok(clustering)
    }
}

/// Index of the largest distance among frames that are not yet centroids.
/// Ties go to the lowest index.
fn farthest_non_center(dists: &[f64], is_center: &[bool]) -> usize {
    let mut best = 0;
    let mut best_d = f64::NEG_INFINITY;
    for (i, (&d, &center)) in dists.iter().zip(is_center).enumerate() {
        if !center && d > best_d {
            best = i;
            best_d = d;
        }
    }
    best
}
