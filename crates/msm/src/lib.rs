//! Markov state models over discrete state sequences.
//!
//! Counts lagged transitions between labelled frames, estimates a
//! row-stochastic transition matrix and derives its stationary distribution,
//! eigenvalues and implied relaxation timescales.
//!
//! # Pipeline
//!
//! ```text
//! sequences ──► label mapping ──► CountMatrix ──► connectivity check
//!                                     │
//!                                     ▼
//!          TransitionEstimator { Reversible | Transpose | NonReversible }
//!                                     │
//!                                     ▼
//!            TransitionMatrix ──► π ──► eigenvalues ──► timescales
//! ```
//!
//! # Quick start
//!
//! ```
//! use msmkit_msm::{MsmConfig, fit_msm};
//!
//! let seqs = vec![vec![0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1]];
//! let msm = fit_msm(&seqs, &MsmConfig::new()).unwrap();
//!
//! assert_eq!(msm.n_states(), 2);
//! assert!((msm.populations().sum() - 1.0).abs() < 1e-12);
//! assert_eq!(msm.timescales().unwrap().len(), 1);
//! ```
//!
//! The `estimate` functions operate on `f64` counts, so fractional
//! (expected) counts from an HMM E-step go through the same estimators.

pub mod config;
pub mod counts;
pub mod error;
pub mod estimate;
pub mod model;
pub mod spectral;
pub mod transition;

pub use config::MsmConfig;
pub use counts::CountMatrix;
pub use error::MsmError;
pub use estimate::{
    ReversibleFit, TransitionEstimator, estimate_transition_matrix, reversible_fixed_point,
    reversible_mle, row_normalize, transpose_estimate,
};
pub use model::{MarkovStateModel, fit_msm};
pub use spectral::{DETAILED_BALANCE_TOLERANCE, eigenvalues, implied_timescales};
pub use transition::{ROW_SUM_TOLERANCE, TransitionMatrix};
