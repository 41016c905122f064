//! End-to-end EM tests: parameter recovery on synthetic data, monotone
//! log-likelihood, cooperative stopping and input errors.

use approx::assert_abs_diff_eq;
use msmkit_core::{Fitted, Trajectory};
use msmkit_hmm::{
    CovarianceType, Covariances, EmissionKind, FitStatus, Gaussian, GaussianHmm, GaussianHmmSpec,
    Hmm, HmmConfig, HmmError, VonMisesHmmSpec, fit_hmm,
};
use msmkit_msm::{TransitionEstimator, TransitionMatrix};
use ndarray::{Array3, array};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// 1000 scalar frames alternating between N(−5, 1) and N(5, 1) every 50
/// frames.
fn two_wells(seed: u64) -> Vec<Trajectory> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let frames: Vec<f64> = (0..1000)
        .map(|t| {
            let mean = if (t / 50) % 2 == 0 { -5.0 } else { 5.0 };
            mean + noise.sample(&mut rng)
        })
        .collect();
    vec![Trajectory::from_scalars(frames).unwrap()]
}

/// 1000 scalar frames: N(offset − 5, 1) for the first half, then a single
/// switch to N(offset + 5, 1).
fn one_switch(seed: u64, offset: f64) -> Vec<Trajectory> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let frames: Vec<f64> = (0..1000)
        .map(|t| {
            let mean = if t < 500 { offset - 5.0 } else { offset + 5.0 };
            mean + noise.sample(&mut rng)
        })
        .collect();
    vec![Trajectory::from_scalars(frames).unwrap()]
}

fn assert_monotone(trace: &[f64]) {
    for w in trace.windows(2) {
        assert!(w[1] >= w[0] - 1e-8 * w[0].abs().max(1.0), "trace {trace:?}");
    }
}

/// Three overlapping 2-D states; EM needs many iterations on these.
fn overlapping(seed: u64) -> Vec<Trajectory> {
    let transmat = TransitionMatrix::new(array![
        [0.90, 0.05, 0.05],
        [0.05, 0.90, 0.05],
        [0.05, 0.05, 0.90]
    ])
    .unwrap();
    let emission = Gaussian::new(
        array![[0.0, 0.0], [1.5, 0.5], [0.5, 1.5]],
        Covariances::Diagonal(array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]),
    )
    .unwrap();
    let truth = Hmm::new(transmat, array![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], emission).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..4).map(|_| truth.sample(400, &mut rng).unwrap().0).collect()
}

/// State indices ordered by the first feature of their mean.
fn order_by_mean(hmm: &GaussianHmm) -> Vec<usize> {
    let means = hmm.emission().means();
    let mut order: Vec<usize> = (0..hmm.n_states()).collect();
    order.sort_by(|&a, &b| means[[a, 0]].total_cmp(&means[[b, 0]]));
    order
}

// ---------------------------------------------------------------------------
// Gaussian recovery
// ---------------------------------------------------------------------------

#[test]
fn two_state_gaussian_recovery() {
    let data = two_wells(11);
    let hmm = GaussianHmmSpec::new(2).with_seed(5).fit(&data).unwrap();
    let order = order_by_mean(&hmm);
    let means = hmm.emission().means();
    assert_abs_diff_eq!(means[[order[0], 0]], -5.0, epsilon = 0.5);
    assert_abs_diff_eq!(means[[order[1], 0]], 5.0, epsilon = 0.5);

    let t = hmm.transition_matrix();
    for k in 0..2 {
        assert!(t.prob(k, k) > 0.9, "diagonal {k} = {}", t.prob(k, k));
        assert_abs_diff_eq!(t.row(k).sum(), 1.0, epsilon = 1e-9);
    }
    assert_eq!(hmm.fit_report().unwrap().status(), FitStatus::Converged);

    // Decoding follows the blocks.
    let path = &hmm.transform(&data).unwrap()[0];
    let errors = path
        .iter()
        .enumerate()
        .filter(|&(i, &s)| s != order[(i / 50) % 2])
        .count();
    assert!(errors < 10, "{errors} misdecoded frames");

    let pi = hmm.populations().unwrap();
    assert_abs_diff_eq!(pi.sum(), 1.0, epsilon = 1e-12);
    assert!(hmm.timescales().unwrap()[0] > 1.0);
}

#[test]
fn single_switch_fits_with_default_settings() {
    // No frame ever returns to the first state, so the reversible
    // transition update sees a near-empty reverse direction.
    let data = one_switch(21, 0.0);
    let hmm = GaussianHmmSpec::new(2).with_seed(4).fit(&data).unwrap();
    let order = order_by_mean(&hmm);
    let means = hmm.emission().means();
    assert_abs_diff_eq!(means[[order[0], 0]], -5.0, epsilon = 0.5);
    assert_abs_diff_eq!(means[[order[1], 0]], 5.0, epsilon = 0.5);
    let t = hmm.transition_matrix();
    for k in 0..2 {
        assert_abs_diff_eq!(t.row(k).sum(), 1.0, epsilon = 1e-9);
    }
    assert_monotone(hmm.fit_report().unwrap().log_likelihoods());
}

#[test]
fn large_offset_keeps_unit_variance() {
    let offset = 1e8;
    let data = one_switch(21, offset);
    let hmm = GaussianHmmSpec::new(2).with_seed(4).fit(&data).unwrap();
    let order = order_by_mean(&hmm);
    let means = hmm.emission().means();
    assert_abs_diff_eq!(means[[order[0], 0]], offset - 5.0, epsilon = 0.5);
    assert_abs_diff_eq!(means[[order[1], 0]], offset + 5.0, epsilon = 0.5);
    let Covariances::Diagonal(var) = hmm.emission().covariances() else {
        panic!("expected diagonal covariances");
    };
    for k in 0..2 {
        assert_abs_diff_eq!(var[[k, 0]], 1.0, epsilon = 0.25);
    }
    assert_monotone(hmm.fit_report().unwrap().log_likelihoods());
}

#[test]
fn full_covariance_recovers_correlation() {
    let transmat = TransitionMatrix::new(array![[0.95, 0.05], [0.05, 0.95]]).unwrap();
    let mut cov = Array3::<f64>::zeros((2, 2, 2));
    cov[[0, 0, 0]] = 1.0;
    cov[[0, 1, 1]] = 1.0;
    cov[[0, 0, 1]] = 0.6;
    cov[[0, 1, 0]] = 0.6;
    cov[[1, 0, 0]] = 1.0;
    cov[[1, 1, 1]] = 1.0;
    let emission = Gaussian::new(array![[-4.0, 0.0], [4.0, 0.0]], Covariances::Full(cov)).unwrap();
    let truth = Hmm::new(transmat, array![0.5, 0.5], emission).unwrap();
    let (traj, _) = truth.sample(2000, &mut StdRng::seed_from_u64(8)).unwrap();

    let hmm = GaussianHmmSpec::new(2)
        .with_covariance_type(CovarianceType::Full)
        .with_seed(2)
        .fit(&[traj])
        .unwrap();
    let order = order_by_mean(&hmm);
    let Covariances::Full(fitted) = hmm.emission().covariances() else {
        panic!("expected full covariances");
    };
    assert_abs_diff_eq!(fitted[[order[0], 0, 1]], 0.6, epsilon = 0.15);
    assert_abs_diff_eq!(fitted[[order[1], 0, 1]], 0.0, epsilon = 0.15);
    assert_abs_diff_eq!(fitted[[order[0], 0, 1]], fitted[[order[0], 1, 0]], epsilon = 1e-12);
}

// ---------------------------------------------------------------------------
// EM properties
// ---------------------------------------------------------------------------

#[test]
fn log_likelihood_is_non_decreasing() {
    let data = overlapping(21);
    for estimator in [TransitionEstimator::Reversible, TransitionEstimator::NonReversible] {
        let config = HmmConfig::new(3)
            .with_estimator(estimator)
            .with_max_iter(40)
            .with_tol(1e-9)
            .with_seed(3);
        let hmm = GaussianHmmSpec::from_config(config).fit(&data).unwrap();
        let trace = hmm.fit_report().unwrap().log_likelihoods();
        assert!(trace.len() > 2);
        for pair in trace.windows(2) {
            assert!(
                pair[1] >= pair[0] - 1e-6 * pair[0].abs(),
                "{estimator:?}: {} -> {}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn fit_until_stops_at_iteration_boundary() {
    let data = overlapping(4);
    let mut calls = 0;
    let hmm = GaussianHmmSpec::from_config(HmmConfig::new(3).with_tol(0.0).with_seed(1))
        .fit_until(&data, || {
            calls += 1;
            calls > 3
        })
        .unwrap();
    let report = hmm.fit_report().unwrap();
    assert_eq!(report.status(), FitStatus::Stopped);
    assert_eq!(report.n_iter(), 3);
}

#[test]
fn predict_proba_is_a_distribution_per_frame() {
    let data = overlapping(9);
    let hmm = GaussianHmmSpec::new(3).with_seed(9).with_max_iter(20).fit(&data).unwrap();
    let gammas = hmm.predict_proba(&data).unwrap();
    assert_eq!(gammas.len(), data.len());
    for (gamma, traj) in gammas.iter().zip(&data) {
        assert_eq!(gamma.dim(), (traj.n_frames(), 3));
        for row in gamma.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }
}

// ---------------------------------------------------------------------------
// Von Mises
// ---------------------------------------------------------------------------

#[test]
fn von_mises_recovery() {
    // Wrapped normal noise, σ = 0.3, around ±1.5 rad in blocks of 50 frames.
    let mut rng = StdRng::seed_from_u64(17);
    let noise = Normal::new(0.0, 0.3).unwrap();
    let frames: Vec<f64> = (0..1000)
        .map(|t| {
            let mean = if (t / 50) % 2 == 0 { -1.5 } else { 1.5 };
            msmkit_core::numeric::wrap_angle(mean + noise.sample(&mut rng))
        })
        .collect();
    let data = vec![Trajectory::from_scalars(frames).unwrap()];

    let fitted = fit_hmm(
        &data,
        &HmmConfig::new(2).with_emission(EmissionKind::VonMises).with_seed(6),
    )
    .unwrap();
    assert_eq!(fitted.emission_kind(), EmissionKind::VonMises);

    let hmm = VonMisesHmmSpec::new(2).with_seed(6).fit(&data).unwrap();
    let means = hmm.emission().means();
    let (lo, hi) = if means[[0, 0]] < means[[1, 0]] { (0, 1) } else { (1, 0) };
    assert_abs_diff_eq!(means[[lo, 0]], -1.5, epsilon = 0.1);
    assert_abs_diff_eq!(means[[hi, 0]], 1.5, epsilon = 0.1);
    for &kappa in hmm.emission().kappas() {
        assert!(kappa > 6.0 && kappa < 25.0, "kappa = {kappa}");
    }
    for k in 0..2 {
        assert!(hmm.transition_matrix().prob(k, k) > 0.9);
    }
    assert!(means.iter().all(|m| (-PI..PI).contains(m)));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn input_errors() {
    assert!(matches!(
        GaussianHmmSpec::new(2).fit(&[]),
        Err(HmmError::EmptyData)
    ));

    let mixed = vec![
        Trajectory::from_scalars(vec![0.0, 1.0, 2.0]).unwrap(),
        Trajectory::from_rows(&[[0.0, 1.0], [1.0, 2.0]]).unwrap(),
    ];
    assert!(matches!(
        GaussianHmmSpec::new(2).fit(&mixed),
        Err(HmmError::DimensionMismatch {
            trajectory: 1,
            expected: 1,
            got: 2
        })
    ));

    let hmm = GaussianHmmSpec::new(2).with_seed(0).fit(&two_wells(1)).unwrap();
    let wide = Trajectory::from_rows(&[[0.0, 1.0]]).unwrap();
    assert!(matches!(
        hmm.score(&[wide]),
        Err(HmmError::DimensionMismatch { .. })
    ));
}
