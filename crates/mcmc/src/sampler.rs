//! Lazy iterator over posterior transition matrix samples.

use msmkit_msm::{CountMatrix, TransitionMatrix};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::chain::{FluxChain, RowChain, Step};
use crate::config::SamplerConfig;
use crate::error::McmcError;

#[derive(Debug, Clone)]
enum Chain {
    Reversible(FluxChain),
    NonReversible(RowChain),
}

impl Chain {
    fn step(&mut self, scale: f64, rng: &mut StdRng) -> Step {
        match self {
            Chain::Reversible(c) => c.step(scale, rng),
            Chain::NonReversible(c) => c.step(scale, rng),
        }
    }

    fn transition_matrix(&self) -> ndarray::Array2<f64> {
        match self {
            Chain::Reversible(c) => c.transition_matrix(),
            Chain::NonReversible(c) => c.transition_matrix(),
        }
    }
}

/// Finite stream of transition matrices drawn from the posterior of a count
/// matrix.
///
/// Created by [`sample_transition_matrices`]. The iterator owns its chain
/// state and RNG; burn-in runs on the first call to `next`, and every
/// further sample costs `n_steps` Metropolis moves. Once exhausted it stays
/// exhausted.
#[derive(Debug, Clone)]
pub struct TransitionSamples {
    chain: Chain,
    rng: StdRng,
    proposal_scale: f64,
    n_steps: usize,
    burn_in: usize,
    burned_in: bool,
    remaining: usize,
    proposed: u64,
    accepted: u64,
}

impl TransitionSamples {
    /// Fraction of proposed moves accepted so far, burn-in included.
    ///
    /// Returns 0.0 before any move has been proposed.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    /// Number of samples still to be yielded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn advance(&mut self, n_moves: usize) {
        for _ in 0..n_moves {
            match self.chain.step(self.proposal_scale, &mut self.rng) {
                Step::Accepted => {
                    self.proposed += 1;
                    self.accepted += 1;
                }
                Step::Rejected => self.proposed += 1,
                Step::Frozen => return,
            }
        }
    }
}

impl Iterator for TransitionSamples {
    type Item = TransitionMatrix;

    fn next(&mut self) -> Option<TransitionMatrix> {
        if self.remaining == 0 {
            return None;
        }
        if !self.burned_in {
            self.advance(self.burn_in);
            self.burned_in = true;
            debug!(
                burn_in = self.burn_in,
                acceptance_rate = self.acceptance_rate(),
                "burn-in complete"
            );
        }
        self.advance(self.n_steps);
        self.remaining -= 1;

        match TransitionMatrix::new(self.chain.transition_matrix()) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(error = %e, "sampler state is not a valid transition matrix, stopping");
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl std::iter::FusedIterator for TransitionSamples {}

/// Samples transition matrices from the posterior of `counts`.
///
/// The chain starts from the symmetrised counts (reversible) or the
/// row-normalised counts (non-reversible) and only moves mass between
/// entries with observed transitions.
///
/// # Errors
///
/// - [`McmcError::InvalidConfig`] if `config` fails validation.
/// - [`McmcError::NoTransitions`] if `counts` is all zero.
/// - [`McmcError::Disconnected`] if the count graph has more than one
///   strongly connected component.
///
/// # Example
///
/// ```
/// use msmkit_mcmc::{SamplerConfig, sample_transition_matrices};
/// use msmkit_msm::CountMatrix;
/// use ndarray::array;
///
/// let counts = CountMatrix::new(array![[80, 20], [10, 90]]).unwrap();
/// let config = SamplerConfig::new().with_n_samples(10).with_seed(1);
/// let samples: Vec<_> = sample_transition_matrices(&counts, &config).unwrap().collect();
/// assert_eq!(samples.len(), 10);
/// ```
#[tracing::instrument(skip(counts, config), fields(n_states = counts.n_states(), n_samples = config.n_samples()))]
pub fn sample_transition_matrices(
    counts: &CountMatrix,
    config: &SamplerConfig,
) -> Result<TransitionSamples, McmcError> {
    config.validate()?;
    if counts.total() == 0 {
        return Err(McmcError::NoTransitions);
    }
    let components = counts.connected_components();
    if components.len() > 1 {
        return Err(McmcError::Disconnected {
            n_components: components.len(),
        });
    }

    let c = counts.to_f64();
    let chain = if config.reversible() {
        Chain::Reversible(FluxChain::new(c.view()))
    } else {
        Chain::NonReversible(RowChain::new(c.view()))
    };
    let rng = match config.seed() {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    info!(
        reversible = config.reversible(),
        burn_in = config.burn_in(),
        n_steps = config.n_steps(),
        "starting transition matrix sampler"
    );
    Ok(TransitionSamples {
        chain,
        rng,
        proposal_scale: config.proposal_scale(),
        n_steps: config.n_steps(),
        burn_in: config.burn_in(),
        burned_in: false,
        remaining: config.n_samples(),
        proposed: 0,
        accepted: 0,
    })
}
