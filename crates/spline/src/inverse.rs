//! Inverse of the Bessel ratio `A(κ) = I1(κ)/I0(κ)`.
//!
//! The von Mises M-step needs `κ = A⁻¹(R̄)` for a mean resultant length `R̄`.
//! There is no closed form, so `ln κ` is tabulated against `A(κ)` once and
//! interpolated with a natural cubic spline.

use std::sync::OnceLock;

use tracing::debug;

use crate::bessel::bessel_ratio;
use crate::error::SplineError;
use crate::natural::NaturalSpline;

/// Number of tabulated knots.
pub const N_KNOTS: usize = 1024;

/// Smallest tabulated concentration.
pub const KAPPA_MIN: f64 = 1e-5;

/// Largest tabulated concentration.
pub const KAPPA_MAX: f64 = 700.0;

/// Spline table mapping `A(κ)` to `ln κ` for κ log-spaced on
/// `[KAPPA_MIN, KAPPA_MAX]`.
#[derive(Debug, Clone)]
pub struct InverseBesselRatio {
    spline: NaturalSpline,
}

impl InverseBesselRatio {
    /// Builds the table. Most callers want the shared instance from
    /// [`inverse_bessel_ratio`] instead.
    pub fn build() -> Result<Self, SplineError> {
        let log_min = KAPPA_MIN.ln();
        let step = (KAPPA_MAX.ln() - log_min) / (N_KNOTS - 1) as f64;
        // Endpoints pinned so the table covers exactly [KAPPA_MIN, KAPPA_MAX].
        let kappa: Vec<f64> = (0..N_KNOTS)
            .map(|i| match i {
                0 => KAPPA_MIN,
                i if i == N_KNOTS - 1 => KAPPA_MAX,
                i => (log_min + step * i as f64).exp(),
            })
            .collect();
        let ratio: Vec<f64> = kappa.iter().map(|&k| bessel_ratio(k)).collect();
        let log_kappa: Vec<f64> = kappa.iter().map(|k| k.ln()).collect();
        let spline = NaturalSpline::new(ratio, log_kappa)?;
        let (min, max) = spline.domain();
        debug!(n_knots = N_KNOTS, min, max, "built inverse Bessel ratio table");
        Ok(Self { spline })
    }

    /// Range of ratios `(A(κ_min), A(κ_max))` the table covers.
    pub fn domain(&self) -> (f64, f64) {
        self.spline.domain()
    }

    /// Returns `ln κ` such that `A(κ) ≈ x`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::OutOfDomain`] if `x` is outside [`domain`](Self::domain).
    pub fn invert(&self, x: f64) -> Result<f64, SplineError> {
        self.spline.eval(x)
    }

    /// Returns `κ` such that `A(κ) ≈ x`.
    pub fn invert_kappa(&self, x: f64) -> Result<f64, SplineError> {
        self.invert(x).map(f64::exp)
    }

    /// The underlying spline.
    pub fn spline(&self) -> &NaturalSpline {
        &self.spline
    }
}

static TABLE: OnceLock<Result<InverseBesselRatio, SplineError>> = OnceLock::new();

/// Process-wide table, built on first use and shared read-only afterwards.
///
/// Concurrent first calls block until a single build finishes.
pub fn inverse_bessel_ratio() -> Result<&'static InverseBesselRatio, SplineError> {
    TABLE
        .get_or_init(InverseBesselRatio::build)
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        let table = inverse_bessel_ratio().unwrap();
        assert_eq!(table.spline().len(), N_KNOTS);
        let (min, max) = table.domain();
        assert!(min > 0.0 && min < 1e-5);
        assert!(max < 1.0 && max > 0.999);
    }

    #[test]
    fn test_shared_instance_is_identical() {
        let a = inverse_bessel_ratio().unwrap() as *const InverseBesselRatio;
        let b = inverse_bessel_ratio().unwrap() as *const InverseBesselRatio;
        assert_eq!(a, b);
    }

    #[test]
    fn test_knots_invert_exactly() {
        let table = inverse_bessel_ratio().unwrap();
        let spline = table.spline();
        for i in [0, 17, 511, N_KNOTS - 1] {
            let got = table.invert(spline.x()[i]).unwrap();
            assert!((got - spline.y()[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_out_of_domain() {
        let table = inverse_bessel_ratio().unwrap();
        assert!(matches!(
            table.invert(0.9999),
            Err(SplineError::OutOfDomain { .. })
        ));
        assert!(matches!(
            table.invert(1e-7),
            Err(SplineError::OutOfDomain { .. })
        ));
    }
}
