//! Fitted hidden Markov models and their queries.

use msmkit_core::{Fitted, Trajectory};
use msmkit_msm::{TransitionMatrix, implied_timescales};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

use crate::emission::Emission;
use crate::error::HmmError;
use crate::forward_backward::{self, Posterior};
use crate::gaussian::Gaussian;
use crate::von_mises::VonMises;

/// How an EM run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStatus {
    /// Log-likelihood improvement fell below the tolerance.
    Converged,
    /// The iteration cap was hit first. The model is still usable.
    MaxIterReached,
    /// The caller's stop check returned `true` at an iteration boundary.
    Stopped,
}

/// Outcome of an EM run: termination status and the log-likelihood trace.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    status: FitStatus,
    log_likelihoods: Vec<f64>,
}

impl FitReport {
    pub(crate) fn new(status: FitStatus, log_likelihoods: Vec<f64>) -> Self {
        Self {
            status,
            log_likelihoods,
        }
    }

    /// Termination status.
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// Whether the run met its tolerance.
    pub fn converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Number of E-steps performed.
    pub fn n_iter(&self) -> usize {
        self.log_likelihoods.len()
    }

    /// Total log-likelihood after each E-step, in order. Non-decreasing.
    pub fn log_likelihoods(&self) -> &[f64] {
        &self.log_likelihoods
    }

    /// Last recorded log-likelihood.
    pub fn final_log_likelihood(&self) -> Option<f64> {
        self.log_likelihoods.last().copied()
    }
}

/// A hidden Markov model with emission family `E`.
///
/// Immutable once built. Obtain one from
/// [`GaussianHmmSpec::fit`](crate::GaussianHmmSpec::fit),
/// [`VonMisesHmmSpec::fit`](crate::VonMisesHmmSpec::fit) or directly from
/// parameters with [`Hmm::new`].
#[derive(Debug, Clone)]
pub struct Hmm<E: Emission> {
    transmat: TransitionMatrix,
    start: Array1<f64>,
    emission: E,
    report: Option<FitReport>,
}

/// HMM with Gaussian emissions.
pub type GaussianHmm = Hmm<Gaussian>;

/// HMM with von Mises emissions.
pub type VonMisesHmm = Hmm<VonMises>;

impl<E: Emission> Hmm<E> {
    /// Assembles a model from parameters.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::InvalidParameters`] if the state counts of the
    /// parts differ or `start` is not a probability vector.
    pub fn new(transmat: TransitionMatrix, start: Array1<f64>, emission: E) -> Result<Self, HmmError> {
        let k = transmat.n_states();
        if emission.n_states() != k || start.len() != k {
            return Err(HmmError::InvalidParameters {
                reason: format!(
                    "transition matrix has {k} states, start vector {}, emissions {}",
                    start.len(),
                    emission.n_states()
                ),
            });
        }
        if start.iter().any(|p| !(p.is_finite() && *p >= 0.0)) || (start.sum() - 1.0).abs() > 1e-8 {
            return Err(HmmError::InvalidParameters {
                reason: "start probabilities must be non-negative and sum to 1".to_string(),
            });
        }
        Ok(Self {
            transmat,
            start,
            emission,
            report: None,
        })
    }

    pub(crate) fn with_report(mut self, report: FitReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Number of hidden states.
    pub fn n_states(&self) -> usize {
        self.transmat.n_states()
    }

    /// Number of features per frame.
    pub fn n_features(&self) -> usize {
        self.emission.n_features()
    }

    /// Hidden-state transition matrix.
    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.transmat
    }

    /// Initial-state distribution.
    pub fn start_probabilities(&self) -> &Array1<f64> {
        &self.start
    }

    /// Emission parameters.
    pub fn emission(&self) -> &E {
        &self.emission
    }

    /// EM report, if this model came from a fit.
    pub fn fit_report(&self) -> Option<&FitReport> {
        self.report.as_ref()
    }

    /// Stationary distribution of the hidden-state chain.
    pub fn populations(&self) -> Result<Array1<f64>, HmmError> {
        Ok(self.transmat.stationary_distribution()?)
    }

    /// Implied timescales of the hidden-state chain in frames, slowest first.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::Msm`] wrapping `NotReversible` when the
    /// transition matrix violates detailed balance.
    pub fn timescales(&self) -> Result<Array1<f64>, HmmError> {
        let pi = self.populations()?;
        let ev = msmkit_msm::eigenvalues(&self.transmat, &pi)?;
        Ok(implied_timescales(&ev, 1))
    }

    pub(crate) fn log_parameters(&self) -> (Array1<f64>, Array2<f64>) {
        (self.start.mapv(f64::ln), self.transmat.as_array().mapv(f64::ln))
    }

    fn check_data(&self, data: &[Trajectory]) -> Result<(), HmmError> {
        if data.is_empty() {
            return Err(HmmError::EmptyData);
        }
        let expected = self.n_features();
        if let Some((i, t)) = data.iter().enumerate().find(|(_, t)| t.n_features() != expected) {
            return Err(HmmError::DimensionMismatch {
                trajectory: i,
                expected,
                got: t.n_features(),
            });
        }
        Ok(())
    }

    fn posteriors(&self, data: &[Trajectory]) -> Result<Vec<Posterior>, HmmError> {
        self.check_data(data)?;
        let (log_start, log_trans) = self.log_parameters();
        let posts: Vec<Posterior> = data
            .par_iter()
            .map(|traj| {
                let log_b = self.emission.log_likelihoods(traj);
                forward_backward::posterior(log_start.view(), log_trans.view(), log_b.view())
            })
            .collect();
        if let Some(i) = posts.iter().position(|p| !p.log_likelihood.is_finite()) {
            return Err(zero_likelihood(i));
        }
        Ok(posts)
    }

    /// Posterior state probabilities `γ_t(k)`, one `n_frames × n_states`
    /// matrix per trajectory.
    pub fn predict_proba(&self, data: &[Trajectory]) -> Result<Vec<Array2<f64>>, HmmError> {
        Ok(self.posteriors(data)?.into_iter().map(|p| p.gamma).collect())
    }

    /// Most probable hidden-state path of every trajectory (Viterbi).
    pub fn decode(&self, data: &[Trajectory]) -> Result<Vec<Vec<usize>>, HmmError> {
        self.check_data(data)?;
        let (log_start, log_trans) = self.log_parameters();
        let paths: Vec<(Vec<usize>, f64)> = data
            .par_iter()
            .map(|traj| {
                let log_b = self.emission.log_likelihoods(traj);
                forward_backward::viterbi(log_start.view(), log_trans.view(), log_b.view())
            })
            .collect();
        if let Some(i) = paths.iter().position(|(_, lp)| !lp.is_finite()) {
            return Err(zero_likelihood(i));
        }
        Ok(paths.into_iter().map(|(path, _)| path).collect())
    }

    /// Total log-likelihood of `data`. Negative infinity if some trajectory
    /// is impossible under the model.
    pub fn log_likelihood(&self, data: &[Trajectory]) -> Result<f64, HmmError> {
        self.check_data(data)?;
        let (log_start, log_trans) = self.log_parameters();
        Ok(data
            .par_iter()
            .map(|traj| {
                let log_b = self.emission.log_likelihoods(traj);
                forward_backward::log_likelihood(log_start.view(), log_trans.view(), log_b.view())
            })
            .sum())
    }
}

fn zero_likelihood(trajectory: usize) -> HmmError {
    HmmError::InvalidParameters {
        reason: format!("trajectory {trajectory} has zero likelihood under the model"),
    }
}

impl<E: Emission> Fitted<[Trajectory]> for Hmm<E> {
    type Output = Vec<Vec<usize>>;
    type Error = HmmError;

    /// Viterbi decoding.
    fn transform(&self, data: &[Trajectory]) -> Result<Vec<Vec<usize>>, HmmError> {
        self.decode(data)
    }

    /// Total log-likelihood.
    fn score(&self, data: &[Trajectory]) -> Result<f64, HmmError> {
        self.log_likelihood(data)
    }
}

fn sample_categorical(p: ArrayView1<f64>, rng: &mut impl rand::Rng) -> usize {
    let u: f64 = rng.random();
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &pi) in p.iter().enumerate() {
        if pi > 0.0 {
            last_positive = i;
            cumulative += pi;
            if cumulative > u {
                return i;
            }
        }
    }
    last_positive
}

impl Hmm<Gaussian> {
    /// Draws a synthetic trajectory of `n_frames` frames together with its
    /// hidden-state path.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::EmptyData`] if `n_frames == 0`.
    pub fn sample(
        &self,
        n_frames: usize,
        rng: &mut impl rand::Rng,
    ) -> Result<(Trajectory, Vec<usize>), HmmError> {
        if n_frames == 0 {
            return Err(HmmError::EmptyData);
        }
        let d = self.n_features();
        let mut states = Vec::with_capacity(n_frames);
        let mut data = vec![0.0; n_frames * d];
        let mut state = sample_categorical(self.start.view(), rng);
        for (t, frame) in data.chunks_exact_mut(d).enumerate() {
            if t > 0 {
                state = self.transmat.sample(state, rng);
            }
            states.push(state);
            self.emission.sample_frame(state, rng, frame);
        }
        Ok((Trajectory::new(data, d)?, states))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::Covariances;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_state() -> GaussianHmm {
        let transmat = TransitionMatrix::new(array![[0.95, 0.05], [0.1, 0.9]]).unwrap();
        let emission = Gaussian::new(
            array![[-5.0], [5.0]],
            Covariances::Diagonal(array![[1.0], [1.0]]),
        )
        .unwrap();
        Hmm::new(transmat, array![0.5, 0.5], emission).unwrap()
    }

    // 1. new_rejects_inconsistent_parts
    #[test]
    fn new_rejects_inconsistent_parts() {
        let transmat = TransitionMatrix::new(array![[1.0]]).unwrap();
        let emission =
            Gaussian::new(array![[0.0], [1.0]], Covariances::Diagonal(array![[1.0], [1.0]])).unwrap();
        assert!(matches!(
            Hmm::new(transmat.clone(), array![1.0], emission),
            Err(HmmError::InvalidParameters { .. })
        ));
        let emission = Gaussian::new(array![[0.0]], Covariances::Diagonal(array![[1.0]])).unwrap();
        assert!(matches!(
            Hmm::new(transmat, array![0.5], emission),
            Err(HmmError::InvalidParameters { .. })
        ));
    }

    // 2. decode_separated_states
    #[test]
    fn decode_separated_states() {
        let hmm = two_state();
        let traj = Trajectory::from_scalars(vec![-5.1, -4.8, 5.2, 4.9, 5.0, -5.0]).unwrap();
        assert_eq!(hmm.decode(&[traj.clone()]).unwrap(), vec![vec![0, 0, 1, 1, 1, 0]]);
        assert_eq!(hmm.transform(&[traj]).unwrap()[0].len(), 6);
    }

    // 3. predict_proba_rows_sum_to_one
    #[test]
    fn predict_proba_rows_sum_to_one() {
        let hmm = two_state();
        let traj = Trajectory::from_scalars(vec![-1.0, 0.0, 1.0, 3.0]).unwrap();
        let gamma = &hmm.predict_proba(&[traj]).unwrap()[0];
        assert_eq!(gamma.dim(), (4, 2));
        for row in gamma.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    // 4. score_is_sum_over_trajectories
    #[test]
    fn score_is_sum_over_trajectories() {
        let hmm = two_state();
        let a = Trajectory::from_scalars(vec![-5.0, -4.0]).unwrap();
        let b = Trajectory::from_scalars(vec![5.0]).unwrap();
        let both = hmm.score(&[a.clone(), b.clone()]).unwrap();
        let sep = hmm.score(&[a]).unwrap() + hmm.score(&[b]).unwrap();
        assert_abs_diff_eq!(both, sep, epsilon = 1e-9);
    }

    // 5. data_checks
    #[test]
    fn data_checks() {
        let hmm = two_state();
        assert!(matches!(hmm.decode(&[]), Err(HmmError::EmptyData)));
        let wide = Trajectory::from_rows(&[[0.0, 1.0]]).unwrap();
        assert!(matches!(
            hmm.score(&[wide]),
            Err(HmmError::DimensionMismatch {
                trajectory: 0,
                expected: 1,
                got: 2
            })
        ));
    }

    // 6. populations_and_timescales
    #[test]
    fn populations_and_timescales() {
        let hmm = two_state();
        let pi = hmm.populations().unwrap();
        assert_abs_diff_eq!(pi[0], 2.0 / 3.0, epsilon = 1e-12);
        let ts = hmm.timescales().unwrap();
        assert_abs_diff_eq!(ts[0], -1.0 / 0.85_f64.ln(), epsilon = 1e-9);
    }

    // 7. sample_shapes_and_determinism
    #[test]
    fn sample_shapes_and_determinism() {
        let hmm = two_state();
        let (traj, states) = hmm.sample(500, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(traj.n_frames(), 500);
        assert_eq!(states.len(), 500);
        let (again, _) = hmm.sample(500, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(traj, again);
        // Frames are far from the other state's mean.
        for (frame, &s) in traj.frames().zip(&states) {
            let mean = if s == 0 { -5.0 } else { 5.0 };
            assert!((frame[0] - mean).abs() < 5.0);
        }
        assert!(matches!(
            hmm.sample(0, &mut StdRng::seed_from_u64(3)),
            Err(HmmError::EmptyData)
        ));
    }

    // 8. report_accessors
    #[test]
    fn report_accessors() {
        let report = FitReport::new(FitStatus::Converged, vec![-10.0, -8.0, -7.5]);
        assert!(report.converged());
        assert_eq!(report.n_iter(), 3);
        assert_eq!(report.final_log_likelihood(), Some(-7.5));
        assert!(two_state().fit_report().is_none());
        assert!(two_state().with_report(report).fit_report().is_some());
    }
}
