//! Fitting and querying Markov state models.

use std::collections::BTreeMap;

use msmkit_core::{Estimator, Fitted};
use ndarray::{Array1, Array2};
use tracing::info;

use crate::config::MsmConfig;
use crate::counts::CountMatrix;
use crate::error::MsmError;
use crate::estimate::{TransitionEstimator, estimate_transition_matrix};
use crate::spectral;
use crate::transition::TransitionMatrix;

/// A fitted Markov state model.
///
/// Input labels may be arbitrary `usize` values; they are compacted to
/// internal states `0..K` in ascending label order. Every matrix and vector
/// on the model is indexed by internal state.
#[derive(Debug, Clone)]
pub struct MarkovStateModel {
    counts: CountMatrix,
    transmat: TransitionMatrix,
    populations: Array1<f64>,
    lag: usize,
    estimator: TransitionEstimator,
    mapping: BTreeMap<usize, usize>,
    n_iter: usize,
}

impl MarkovStateModel {
    /// Number of states.
    pub fn n_states(&self) -> usize {
        self.transmat.n_states()
    }

    /// Observed transition counts at the model's lag.
    pub fn counts(&self) -> &CountMatrix {
        &self.counts
    }

    /// Estimated transition matrix.
    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transmat
    }

    /// Stationary distribution of the transition matrix.
    pub fn populations(&self) -> &Array1<f64> {
        &self.populations
    }

    /// Lag time in frames.
    pub fn lag(&self) -> usize {
        self.lag
    }

    /// Estimator that produced the transition matrix.
    pub fn estimator(&self) -> TransitionEstimator {
        self.estimator
    }

    /// Map from input label to internal state.
    pub fn mapping(&self) -> &BTreeMap<usize, usize> {
        &self.mapping
    }

    /// Input label of each internal state.
    pub fn labels(&self) -> Vec<usize> {
        self.mapping.keys().copied().collect()
    }

    /// Iterations used by the reversible estimator (0 for closed-form ones).
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Transition matrix eigenvalues, descending.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::NotReversible`] unless the model satisfies
    /// detailed balance (always the case for `Reversible` and `Transpose`).
    pub fn eigenvalues(&self) -> Result<Array1<f64>, MsmError> {
        spectral::eigenvalues(&self.transmat, &self.populations)
    }

    /// Implied relaxation timescales in frames, slowest first.
    pub fn timescales(&self) -> Result<Array1<f64>, MsmError> {
        let ev = self.eigenvalues()?;
        Ok(spectral::implied_timescales(&ev, self.lag))
    }

    /// Simulates `n_steps` internal states following `initial`.
    ///
    /// Each step advances one lag time. `initial` itself is not included.
    ///
    /// # Errors
    ///
    /// Returns [`MsmError::StateOutOfRange`] if `initial >= n_states()`.
    pub fn sample_states(
        &self,
        n_steps: usize,
        initial: usize,
        rng: &mut impl rand::Rng,
    ) -> Result<Vec<usize>, MsmError> {
        let mut out = vec![0; n_steps];
        self.sample_states_into(initial, rng, &mut out)?;
        Ok(out)
    }

    /// Simulates states into a pre-allocated buffer.
    pub fn sample_states_into(
        &self,
        initial: usize,
        rng: &mut impl rand::Rng,
        out: &mut [usize],
    ) -> Result<(), MsmError> {
        if initial >= self.n_states() {
            return Err(MsmError::StateOutOfRange {
                state: initial,
                n_states: self.n_states(),
            });
        }
        let mut prev = initial;
        for slot in out.iter_mut() {
            let next = self.transmat.sample(prev, rng);
            *slot = next;
            prev = next;
        }
        Ok(())
    }

    /// Maps input labels to internal states.
    fn map_sequences(&self, sequences: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, MsmError> {
        sequences
            .iter()
            .map(|seq| {
                seq.iter()
                    .map(|label| {
                        self.mapping
                            .get(label)
                            .copied()
                            .ok_or(MsmError::UnknownLabel { label: *label })
                    })
                    .collect()
            })
            .collect()
    }
}

impl Fitted<[Vec<usize>]> for MarkovStateModel {
    type Output = Vec<Vec<usize>>;
    type Error = MsmError;

    /// Maps input labels to internal states.
    ///
    /// Fails with [`MsmError::UnknownLabel`] on a label not seen during fitting.
    fn transform(&self, sequences: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, MsmError> {
        self.map_sequences(sequences)
    }

    /// Log-likelihood of the lagged transitions in `sequences`.
    fn score(&self, sequences: &[Vec<usize>]) -> Result<f64, MsmError> {
        let mapped = self.map_sequences(sequences)?;
        let counts = CountMatrix::from_sequences(&mapped, self.n_states(), self.lag, true)?;
        Ok(self.transmat.log_likelihood(&counts))
    }
}

impl Estimator<[Vec<usize>]> for MsmConfig {
    type Fitted = MarkovStateModel;
    type Error = MsmError;

    fn fit(&self, sequences: &[Vec<usize>]) -> Result<MarkovStateModel, MsmError> {
        fit_msm(sequences, self)
    }
}

/// Fits a Markov state model to discrete state sequences.
///
/// # Errors
///
/// - [`MsmError::InvalidLag`] / [`MsmError::InvalidConfig`] for a bad config.
/// - [`MsmError::EmptyData`] if there are no labels at all.
/// - [`MsmError::NoTransitions`] if no sequence is longer than the lag.
/// - [`MsmError::Disconnected`] if the count graph has more than one
///   strongly connected component.
/// - [`MsmError::NumericalFailure`] if the reversible estimator fails.
#[tracing::instrument(skip(sequences, config), fields(n_sequences = sequences.len(), lag = config.lag()))]
pub fn fit_msm(sequences: &[Vec<usize>], config: &MsmConfig) -> Result<MarkovStateModel, MsmError> {
    config.validate()?;

    let mapping: BTreeMap<usize, usize> = {
        let mut labels: Vec<usize> = sequences.iter().flatten().copied().collect();
        labels.sort_unstable();
        labels.dedup();
        labels.into_iter().enumerate().map(|(i, l)| (l, i)).collect()
    };
    if mapping.is_empty() {
        return Err(MsmError::EmptyData);
    }
    let n_states = mapping.len();
    let mapped: Vec<Vec<usize>> = sequences
        .iter()
        .map(|seq| seq.iter().map(|l| mapping[l]).collect())
        .collect();

    let counts = CountMatrix::from_sequences(&mapped, n_states, config.lag(), config.sliding_window())?;
    if counts.total() == 0 {
        return Err(MsmError::NoTransitions { lag: config.lag() });
    }
    counts.check_connected()?;

    let (probs, n_iter): (Array2<f64>, usize) = estimate_transition_matrix(
        counts.to_f64().view(),
        config.estimator(),
        config.prior(),
        config.tol(),
        config.max_iter(),
    )?;
    let transmat = TransitionMatrix::new(probs)?;
    let populations = transmat.stationary_distribution()?;

    info!(
        n_states,
        n_transitions = counts.total(),
        n_iter,
        "MSM fitted"
    );
    Ok(MarkovStateModel {
        counts,
        transmat,
        populations,
        lag: config.lag(),
        estimator: config.estimator(),
        mapping,
        n_iter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    // 1. label_mapping_is_compacted
    #[test]
    fn label_mapping_is_compacted() {
        let seqs = vec![vec![10, 30, 10, 30, 30, 10]];
        let msm = fit_msm(&seqs, &MsmConfig::new()).unwrap();
        assert_eq!(msm.n_states(), 2);
        assert_eq!(msm.labels(), vec![10, 30]);
        assert_eq!(msm.transform(&seqs).unwrap(), vec![vec![0, 1, 0, 1, 1, 0]]);
    }

    // 2. unknown_label_in_transform
    #[test]
    fn unknown_label_in_transform() {
        let msm = fit_msm(&[vec![0, 1, 0, 1]], &MsmConfig::new()).unwrap();
        assert!(matches!(
            msm.transform(&[vec![0, 7]]),
            Err(MsmError::UnknownLabel { label: 7 })
        ));
    }

    // 3. empty_inputs
    #[test]
    fn empty_inputs() {
        assert!(matches!(
            fit_msm(&[], &MsmConfig::new()),
            Err(MsmError::EmptyData)
        ));
        assert!(matches!(
            fit_msm(&[vec![]], &MsmConfig::new()),
            Err(MsmError::EmptyData)
        ));
    }

    // 4. too_short_for_lag
    #[test]
    fn too_short_for_lag() {
        assert!(matches!(
            fit_msm(&[vec![0, 1, 0]], &MsmConfig::new().with_lag(3)),
            Err(MsmError::NoTransitions { lag: 3 })
        ));
    }

    // 5. disconnected_counts
    #[test]
    fn disconnected_counts() {
        // 0 ↔ 1, then an absorbing jump to 2.
        let seqs = vec![vec![0, 1, 0, 1, 2, 2, 2]];
        assert!(matches!(
            fit_msm(&seqs, &MsmConfig::new()),
            Err(MsmError::Disconnected { .. })
        ));
    }

    // 6. single_state
    #[test]
    fn single_state() {
        let msm = fit_msm(&[vec![4, 4, 4]], &MsmConfig::new()).unwrap();
        assert_eq!(msm.n_states(), 1);
        assert_abs_diff_eq!(msm.transition_matrix().prob(0, 0), 1.0);
        assert_abs_diff_eq!(msm.populations()[0], 1.0);
        assert!(msm.timescales().unwrap().is_empty());
    }

    // 7. score_matches_log_likelihood
    #[test]
    fn score_matches_log_likelihood() {
        let seqs = vec![vec![0, 0, 1, 1, 0, 1, 0, 0]];
        let msm = fit_msm(
            &seqs,
            &MsmConfig::new().with_estimator(TransitionEstimator::NonReversible),
        )
        .unwrap();
        let expected = msm.transition_matrix().log_likelihood(msm.counts());
        assert_abs_diff_eq!(msm.score(&seqs).unwrap(), expected, epsilon = 1e-12);
    }

    // 8. sample_states_length_and_determinism
    #[test]
    fn sample_states_length_and_determinism() {
        let msm = fit_msm(&[vec![0, 1, 1, 0, 0, 1, 0]], &MsmConfig::new()).unwrap();
        let a = msm.sample_states(100, 0, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = msm.sample_states(100, 0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert!(a.iter().all(|&s| s < 2));
        assert!(matches!(
            msm.sample_states(5, 2, &mut StdRng::seed_from_u64(1)),
            Err(MsmError::StateOutOfRange { state: 2, .. })
        ));
    }

    // 9. estimator_trait
    #[test]
    fn estimator_trait() {
        let cfg = MsmConfig::new().with_estimator(TransitionEstimator::Transpose);
        let msm = cfg.fit(&[vec![0, 1, 1, 0]]).unwrap();
        assert_eq!(msm.estimator(), TransitionEstimator::Transpose);
        assert_eq!(msm.n_iter(), 0);
    }
}
