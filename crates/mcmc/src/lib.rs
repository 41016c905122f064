//! Metropolis sampling of transition matrices.
//!
//! Given a [`CountMatrix`](msmkit_msm::CountMatrix), draws transition
//! matrices from the posterior `p(T | C) ∝ Π T_ij^C_ij` under a flat prior on
//! the count sparsity pattern. Samples quantify the statistical uncertainty
//! of an MSM: push each one through `stationary_distribution()` or the
//! spectral functions to get error bars.
//!
//! Two chains are available:
//!
//! - **reversible** (default): moves on the symmetric flux matrix, so every
//!   sample satisfies detailed balance;
//! - **non-reversible**: independent row moves.
//!
//! # Quick start
//!
//! ```
//! use msmkit_mcmc::{SamplerConfig, sample_transition_matrices};
//! use msmkit_msm::CountMatrix;
//! use ndarray::array;
//!
//! let counts = CountMatrix::new(array![[90, 10], [5, 95]]).unwrap();
//! let config = SamplerConfig::new().with_n_samples(50).with_seed(42);
//!
//! let mut samples = sample_transition_matrices(&counts, &config).unwrap();
//! let mean_p01: f64 = samples.by_ref().map(|t| t.prob(0, 1)).sum::<f64>() / 50.0;
//! assert!(mean_p01 > 0.0 && mean_p01 < 0.3);
//! assert!(samples.acceptance_rate() > 0.0);
//! ```

mod chain;
pub mod config;
pub mod error;
pub mod sampler;

pub use config::SamplerConfig;
pub use error::McmcError;
pub use sampler::{TransitionSamples, sample_transition_matrices};
