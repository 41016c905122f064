//! Shared building blocks for the msmkit workspace.
//!
//! Every estimator crate depends on this one for:
//!
//! - [`Trajectory`]: validated, row-major container of continuous frames.
//! - [`Estimator`] / [`Fitted`]: the fit / transform / score capability set.
//! - [`numeric`]: log-space reductions ([`logsumexp`], [`logaddexp`]) and
//!   scalar statistics.
//!
//! # Quick start
//!
//! ```
//! use msmkit_core::{Trajectory, logsumexp};
//!
//! let traj = Trajectory::from_rows(&[[0.0, 1.0], [2.0, 3.0]]).unwrap();
//! assert_eq!(traj.n_frames(), 2);
//! assert!((logsumexp(&[0.0, 0.0]) - 2.0_f64.ln()).abs() < 1e-12);
//! ```

mod error;
mod estimator;
pub mod numeric;
mod trajectory;

pub use error::CoreError;
pub use estimator::{Estimator, Fitted};
pub use numeric::{logaddexp, logsumexp};
pub use trajectory::{Trajectory, check_common_features};
