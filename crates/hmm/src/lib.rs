//! Hidden Markov models with Gaussian or von Mises emissions.
//!
//! Models are fitted by log-space Baum-Welch. The E-step runs the
//! forward-backward recursions on every trajectory in parallel (rayon) and
//! reduces the sufficient statistics; the M-step updates transitions through
//! the estimators of `msmkit-msm` (reversible by default) and emissions in
//! closed form. Von Mises concentrations are recovered from the mean
//! resultant length through the spline inverter of `msmkit-spline`.
//!
//! # Quick start
//!
//! ```
//! use msmkit_core::{Fitted, Trajectory};
//! use msmkit_hmm::{FitStatus, GaussianHmmSpec};
//!
//! let frames: Vec<f64> = (0..40)
//!     .map(|i| {
//!         let well = if (i / 10) % 2 == 0 { -3.0 } else { 3.0 };
//!         well + 0.1 * ((i * 7) % 5) as f64
//!     })
//!     .collect();
//! let data = vec![Trajectory::from_scalars(frames).unwrap()];
//!
//! let hmm = GaussianHmmSpec::new(2).with_seed(0).fit(&data).unwrap();
//! assert_ne!(hmm.fit_report().unwrap().status(), FitStatus::Stopped);
//!
//! let path = &hmm.transform(&data).unwrap()[0];
//! assert_ne!(path[0], path[10]);
//! ```

pub mod config;
mod em;
pub mod emission;
pub mod error;
pub mod estimator;
mod forward_backward;
pub mod gaussian;
pub mod model;
pub mod von_mises;

pub use config::{CovarianceType, EmissionKind, HmmConfig};
pub use emission::Emission;
pub use error::HmmError;
pub use estimator::{FittedHmm, GaussianHmmSpec, VonMisesHmmSpec, fit_hmm, fit_hmm_until};
pub use gaussian::{Covariances, Gaussian, GaussianStats};
pub use model::{FitReport, FitStatus, GaussianHmm, Hmm, VonMisesHmm};
pub use von_mises::{VonMises, VonMisesStats};
