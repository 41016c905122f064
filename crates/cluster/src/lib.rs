//! Spatial discretisation of continuous trajectories.
//!
//! Turns frames into discrete state labels by clustering them around a set
//! of centroids. Two estimators are provided:
//!
//! | Estimator | Parameter | Behaviour |
//! |-----------|-----------|-----------|
//! | [`RegularSpatial`] | cutoff `d_min` | single pass, new centroid when farther than `d_min` from all |
//! | [`KCenters`] | `n_clusters` | greedy farthest-point, 2-approximate minimax radius |
//!
//! Both are generic over a [`Metric`]; [`Euclidean`] is the default and
//! [`Periodic`] handles angular features.
//!
//! # Quick start
//!
//! ```
//! use msmkit_cluster::{RegularSpatial, Clustering};
//! use msmkit_core::{Estimator, Fitted, Trajectory};
//!
//! let traj = Trajectory::from_rows(&[[0.0, 0.0], [0.1, 0.0], [5.0, 5.0]]).unwrap();
//! let clustering: Clustering = RegularSpatial::new(1.0).fit(&[traj.clone()]).unwrap();
//! assert_eq!(clustering.n_clusters(), 2);
//! assert_eq!(clustering.transform(&[traj]).unwrap()[0], vec![0, 0, 1]);
//! ```
//!
//! # Architecture
//!
//! ```text
//! fit()
//!   ├─ validate config + shapes   (pooled_features)
//!   ├─ choose centroids           (spatial.rs | kcenters.rs, rayon distance update)
//!   └─ Clustering                 (result.rs: labels, transform, score)
//! ```

pub mod distance;
pub mod error;
pub mod kcenters;
pub mod result;
pub mod spatial;

pub use distance::{Euclidean, Manhattan, Metric, MetricKind, Periodic};
pub use error::ClusterError;
pub use kcenters::KCenters;
pub use result::{Cluster, Clustering};
pub use spatial::RegularSpatial;

use msmkit_core::{Trajectory, check_common_features};

/// Common feature count of `data`, mapping shape errors to [`ClusterError`].
pub(crate) fn pooled_features(data: &[Trajectory]) -> Result<usize, ClusterError> {
    check_common_features(data).map_err(ClusterError::from_core)
}

/// Splits a pooled per-frame vector back into per-trajectory pieces.
pub(crate) fn split_by_lengths<T>(pooled: Vec<T>, lengths: &[usize]) -> Vec<Vec<T>> {
    let mut out = Vec::with_capacity(lengths.len());
    let mut iter = pooled.into_iter();
    for &len in lengths {
        out.push(iter.by_ref().take(len).collect());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_by_lengths() {
        let parts = split_by_lengths(vec![1, 2, 3, 4, 5], &[2, 0, 3]);
        assert_eq!(parts, vec![vec![1, 2], vec![], vec![3, 4, 5]]);
    }

    #[test]
    fn test_pooled_features_errors() {
        assert!(matches!(pooled_features(&[]), Err(ClusterError::EmptyData)));
        let a = Trajectory::new(vec![0.0], 1).unwrap();
        let b = Trajectory::new(vec![0.0, 1.0], 2).unwrap();
        assert!(matches!(
            pooled_features(&[a, b]),
            Err(ClusterError::DimensionMismatch { trajectory: 1, .. })
        ));
    }
}
