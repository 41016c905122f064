use approx::assert_abs_diff_eq;
use ndarray::array;
use rand::SeedableRng;
use rand::rngs::StdRng;
use msmkit_msm::{
    MsmConfig, MsmError, TransitionEstimator, TransitionMatrix, fit_msm,
};

/// Simulates `n` steps of `t` starting in state 0, including the start.
fn simulate(t: &TransitionMatrix, n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seq = Vec::with_capacity(n);
    let mut s = 0;
    seq.push(s);
    for _ in 1..n {
        s = t.sample(s, &mut rng);
        seq.push(s);
    }
    seq
}

fn reference_chain() -> TransitionMatrix {
    // Birth-death chain, reversible by construction.
    TransitionMatrix::new(array![
        [0.80, 0.20, 0.00],
        [0.10, 0.70, 0.20],
        [0.00, 0.30, 0.70]
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// 1. cyclic_chain_recovered
// ---------------------------------------------------------------------------
#[test]
fn cyclic_chain_recovered() {
    let seq: Vec<usize> = (0..300).map(|i| i % 3).collect();
    let config = MsmConfig::new().with_estimator(TransitionEstimator::NonReversible);
    let msm = fit_msm(&[seq], &config).unwrap();

    let t = msm.transition_matrix();
    for i in 0..3 {
        for j in 0..3 {
            let expected = if j == (i + 1) % 3 { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(t.prob(i, j), expected, epsilon = 0.05);
        }
    }
    for &p in msm.populations().iter() {
        assert_abs_diff_eq!(p, 1.0 / 3.0, epsilon = 1e-9);
    }
    // A rotation has complex eigenvalues; the spectrum is not defined here.
    assert!(matches!(
        msm.timescales(),
        Err(MsmError::NotReversible { .. })
    ));
}

// ---------------------------------------------------------------------------
// 2. lag_skips_frames
// ---------------------------------------------------------------------------
#[test]
fn lag_skips_frames() {
    let seq: Vec<usize> = (0..300).map(|i| i % 3).collect();
    let config = MsmConfig::new()
        .with_lag(2)
        .with_estimator(TransitionEstimator::NonReversible);
    let msm = fit_msm(&[seq], &config).unwrap();
    for i in 0..3 {
        assert_abs_diff_eq!(msm.transition_matrix().prob(i, (i + 2) % 3), 1.0);
    }
    assert_eq!(msm.counts().total(), 298);
}

// ---------------------------------------------------------------------------
// 3. reversible_estimate_is_consistent
// ---------------------------------------------------------------------------
#[test]
fn reversible_estimate_is_consistent() {
    let truth = reference_chain();
    let seq = simulate(&truth, 20_000, 11);
    let msm = fit_msm(&[seq], &MsmConfig::new()).unwrap();

    let t = msm.transition_matrix();
    let pi = msm.populations();

    for row in t.as_array().rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
    assert!(t.detailed_balance_violation(pi.view()) < 1e-9);

    let pi_t = pi.dot(t.as_array());
    for (a, b) in pi_t.iter().zip(pi.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }

    for i in 0..3 {
        for j in 0..3 {
            assert_abs_diff_eq!(t.prob(i, j), truth.prob(i, j), epsilon = 0.03);
        }
    }
}

// ---------------------------------------------------------------------------
// 4. timescales_ordered_and_positive
// ---------------------------------------------------------------------------
#[test]
fn timescales_ordered_and_positive() {
    let seq = simulate(&reference_chain(), 10_000, 5);
    let msm = fit_msm(&[seq], &MsmConfig::new().with_lag(3)).unwrap();

    let ev = msm.eigenvalues().unwrap();
    assert_abs_diff_eq!(ev[0], 1.0, epsilon = 1e-9);

    let ts = msm.timescales().unwrap();
    assert_eq!(ts.len(), 2);
    assert!(ts.iter().all(|&t| t > 0.0 && t.is_finite()));
    assert!(ts[0] >= ts[1]);
}

// ---------------------------------------------------------------------------
// 5. disconnected_sequences_rejected
// ---------------------------------------------------------------------------
#[test]
fn disconnected_sequences_rejected() {
    let seqs = vec![vec![0, 1, 0, 1, 0], vec![2, 3, 2, 3, 2]];
    match fit_msm(&seqs, &MsmConfig::new()) {
        Err(MsmError::Disconnected {
            n_components,
            largest,
        }) => {
            assert_eq!(n_components, 2);
            assert_eq!(largest, 2);
        }
        other => panic!("expected Disconnected, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// 6. strided_counting_uses_fewer_pairs
// ---------------------------------------------------------------------------
#[test]
fn strided_counting_uses_fewer_pairs() {
    let seq = simulate(&reference_chain(), 1_000, 3);
    let sliding = fit_msm(&[seq.clone()], &MsmConfig::new().with_lag(4)).unwrap();
    let strided = fit_msm(
        &[seq],
        &MsmConfig::new().with_lag(4).with_sliding_window(false),
    )
    .unwrap();
    assert_eq!(sliding.counts().total(), 996);
    assert_eq!(strided.counts().total(), 249);
}

// ---------------------------------------------------------------------------
// 7. sampling_is_deterministic_and_stationary
// ---------------------------------------------------------------------------
#[test]
fn sampling_is_deterministic_and_stationary() {
    let seq = simulate(&reference_chain(), 20_000, 21);
    let msm = fit_msm(&[seq], &MsmConfig::new()).unwrap();

    let a = msm
        .sample_states(50_000, 0, &mut StdRng::seed_from_u64(8))
        .unwrap();
    let b = msm
        .sample_states(50_000, 0, &mut StdRng::seed_from_u64(8))
        .unwrap();
    assert_eq!(a, b);

    let mut freq = [0.0; 3];
    for &s in &a {
        freq[s] += 1.0 / a.len() as f64;
    }
    for (f, p) in freq.iter().zip(msm.populations().iter()) {
        assert_abs_diff_eq!(*f, *p, epsilon = 0.03);
    }
}
