//! Spline inversion of the von Mises mean resultant length.
//!
//! The maximum-likelihood concentration of a von Mises distribution solves
//! `I1(κ)/I0(κ) = R̄`. This crate tabulates that relation once per process
//! (1024 knots, κ log-spaced on `[1e-5, 700]`) and answers `R̄ → ln κ`
//! queries by natural cubic spline interpolation.
//!
//! ```text
//! bessel::bessel_ratio ──► tabulate (x = A(κ), y = ln κ) ──► NaturalSpline
//!                                                              │
//!                      inverse_bessel_ratio() (OnceLock) ◄─────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use msmkit_spline::{bessel_ratio, inverse_bessel_ratio};
//!
//! let table = inverse_bessel_ratio().unwrap();
//! let kappa = table.invert_kappa(bessel_ratio(3.0)).unwrap();
//! assert!((kappa - 3.0).abs() < 0.03);
//! ```

pub mod bessel;
pub mod error;
pub mod inverse;
pub mod natural;

pub use bessel::{bessel_ratio, log_i0, log_i1};
pub use error::SplineError;
pub use inverse::{InverseBesselRatio, KAPPA_MAX, KAPPA_MIN, N_KNOTS, inverse_bessel_ratio};
pub use natural::NaturalSpline;
