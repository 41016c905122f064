//! Configuration for the transition matrix sampler.

use crate::error::McmcError;

/// Configuration for [`sample_transition_matrices`](crate::sample_transition_matrices).
///
/// # Example
///
/// ```
/// use msmkit_mcmc::SamplerConfig;
///
/// let config = SamplerConfig::new()
///     .with_n_samples(500)
///     .with_proposal_scale(0.02)
///     .with_seed(7);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    n_samples: usize,
    proposal_scale: f64,
    n_steps: usize,
    burn_in: usize,
    reversible: bool,
    seed: Option<u64>,
}

impl SamplerConfig {
    /// Creates a new configuration with defaults.
    ///
    /// Defaults: `n_samples = 100`, `proposal_scale = 0.01`, `n_steps = 100`,
    /// `burn_in = 1000`, `reversible = true`, no seed.
    pub fn new() -> Self {
        Self {
            n_samples: 100,
            proposal_scale: 0.01,
            n_steps: 100,
            burn_in: 1000,
            reversible: true,
            seed: None,
        }
    }

    /// Sets the number of matrices the sampler yields.
    pub fn with_n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Sets the half-width of the uniform mass transfer proposed per move.
    pub fn with_proposal_scale(mut self, proposal_scale: f64) -> Self {
        self.proposal_scale = proposal_scale;
        self
    }

    /// Sets the number of Metropolis moves between yielded matrices.
    pub fn with_n_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = n_steps;
        self
    }

    /// Sets the number of moves discarded before the first sample.
    pub fn with_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = burn_in;
        self
    }

    /// Restricts samples to reversible matrices (`true`) or not.
    pub fn with_reversible(mut self, reversible: bool) -> Self {
        self.reversible = reversible;
        self
    }

    /// Seeds the sampler RNG. Without a seed the OS entropy source is used.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    // --- Accessors ---

    /// Returns the number of samples.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Returns the proposal half-width.
    pub fn proposal_scale(&self) -> f64 {
        self.proposal_scale
    }

    /// Returns the moves per sample.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Returns the burn-in length.
    pub fn burn_in(&self) -> usize {
        self.burn_in
    }

    /// Returns whether samples are reversible.
    pub fn reversible(&self) -> bool {
        self.reversible
    }

    /// Returns the seed, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), McmcError> {
        if !self.proposal_scale.is_finite() || self.proposal_scale <= 0.0 {
            return Err(McmcError::InvalidConfig {
                reason: format!(
                    "proposal_scale must be finite and positive, got {}",
                    self.proposal_scale
                ),
            });
        }
        if self.n_steps == 0 {
            return Err(McmcError::InvalidConfig {
                reason: "n_steps must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::new()
    }
}
