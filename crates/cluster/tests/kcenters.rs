//! Integration tests for k-centers properties.

use msmkit_cluster::{Euclidean, KCenters, Metric};
use msmkit_core::{Estimator, Fitted, Trajectory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_trajectories(rng: &mut StdRng, n_traj: usize, n_frames: usize, dim: usize) -> Vec<Trajectory> {
    (0..n_traj)
        .map(|_| {
            let data: Vec<f64> = (0..n_frames * dim).map(|_| rng.random_range(-5.0..5.0)).collect();
            Trajectory::new(data, dim).unwrap()
        })
        .collect()
}

#[test]
fn max_radius_non_increasing_in_k() {
    let mut rng = StdRng::seed_from_u64(42);
    let data = random_trajectories(&mut rng, 3, 40, 2);

    let mut previous = f64::INFINITY;
    for k in 1..=30 {
        let radius = KCenters::new(k).fit(&data).unwrap().max_radius();
        assert!(
            radius <= previous + 1e-12,
            "radius increased at k = {k}: {radius} > {previous}"
        );
        previous = radius;
    }
}

#[test]
fn within_twice_optimal_radius() {
    let mut rng = StdRng::seed_from_u64(7);
    let data = random_trajectories(&mut rng, 1, 9, 1);
    let frames: Vec<f64> = data[0].as_slice().to_vec();
    let k = 3;

    // Exhaustive optimum over centroid triples drawn from the data.
    let n = frames.len();
    let mut optimum = f64::INFINITY;
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                let radius = frames
                    .iter()
                    .map(|&x| {
                        [frames[a], frames[b], frames[c]]
                            .iter()
                            .map(|&m| (x - m).abs())
                            .fold(f64::INFINITY, f64::min)
                    })
                    .fold(0.0, f64::max);
                optimum = optimum.min(radius);
            }
        }
    }

    let clustering = KCenters::new(k).fit(&data).unwrap();
    assert!(clustering.max_radius() <= 2.0 * optimum + 1e-12);
}

#[test]
fn labels_are_nearest_centroid() {
    let mut rng = StdRng::seed_from_u64(3);
    let data = random_trajectories(&mut rng, 2, 50, 3);
    let clustering = KCenters::new(6).fit(&data).unwrap();

    for (t, traj) in data.iter().enumerate() {
        for (f, frame) in traj.frames().enumerate() {
            let assigned = clustering.labels()[t][f];
            let d_assigned = Euclidean.distance(frame, clustering.centroids().frame(assigned));
            for c in clustering.centroids().frames() {
                assert!(d_assigned <= Euclidean.distance(frame, c) + 1e-12);
            }
            assert!((clustering.distances()[t][f] - d_assigned).abs() < 1e-12);
        }
    }

    // Transform on the training data reproduces the training labels.
    assert_eq!(clustering.transform(&data).unwrap(), clustering.labels());
}

#[test]
fn clusters_partition_all_frames() {
    let mut rng = StdRng::seed_from_u64(11);
    let data = random_trajectories(&mut rng, 4, 25, 2);
    let clustering = KCenters::new(5).with_seed(1).fit(&data).unwrap();
    let clusters = clustering.clusters();
    assert_eq!(clusters.len(), 5);
    let total: usize = clusters.iter().map(|c| c.len()).sum();
    assert_eq!(total, 100);
    // Every centroid is itself a training frame, so no cluster is empty.
    assert!(clusters.iter().all(|c| !c.is_empty()));
}

#[test]
fn score_is_negative_inertia() {
    let data = vec![Trajectory::from_scalars(vec![0.0, 1.0, 10.0, 12.0]).unwrap()];
    let clustering = KCenters::new(2).fit(&data).unwrap();
    // centroids 0.0 and 12.0: residuals 0, 1, 2, 0
    assert!((clustering.score(&data).unwrap() + 5.0).abs() < 1e-12);
}
