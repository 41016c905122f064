//! Log-space modified Bessel functions of the first kind, orders 0 and 1.
//!
//! Both use the power series
//!
//! ```text
//! I_ν(x) = Σₖ (x/2)^(2k+ν) / (k! Γ(k+ν+1))
//! ```
//!
//! with every term kept in log space and summed by `logsumexp`, so values up
//! to `x ≈ 700` (where `I0` is near `f64::MAX`) stay finite. Beyond
//! [`ASYMPTOTIC_THRESHOLD`] the leading terms of the large-argument
//! expansion take over.

use msmkit_core::logsumexp;
use statrs::function::gamma::ln_gamma;

/// Arguments above this use the asymptotic expansion.
pub const ASYMPTOTIC_THRESHOLD: f64 = 1000.0;

/// Terms smaller than the largest by this many nats are dropped.
const LOG_TRUNCATION: f64 = 40.0;

const MAX_TERMS: usize = 10_000;

fn log_series(x: f64, order: f64) -> f64 {
    let log_half = (0.5 * x).ln();
    let mut terms = Vec::with_capacity(64);
    let mut peak = f64::NEG_INFINITY;
    for k in 0..MAX_TERMS {
        let kf = k as f64;
        let t = (2.0 * kf + order) * log_half - ln_gamma(kf + 1.0) - ln_gamma(kf + order + 1.0);
        peak = peak.max(t);
        terms.push(t);
        // Terms rise until k ≈ x/2, then fall monotonically.
        if kf > 0.5 * x && t < peak - LOG_TRUNCATION {
            break;
        }
    }
    logsumexp(&terms)
}

fn log_asymptotic(x: f64, order: f64) -> f64 {
    // I_ν(x) ≈ e^x / √(2πx) · (1 − (μ−1)/(8x) + (μ−1)(μ−9)/(2!(8x)²)), μ = 4ν²
    let mu = 4.0 * order * order;
    let z = 8.0 * x;
    let corr = 1.0 - (mu - 1.0) / z + (mu - 1.0) * (mu - 9.0) / (2.0 * z * z);
    x - 0.5 * (std::f64::consts::TAU * x).ln() + corr.ln()
}

/// `ln I0(x)` for `x >= 0`. Negative arguments use `|x|` (I0 is even).
pub fn log_i0(x: f64) -> f64 {
    let x = x.abs();
    if x == 0.0 {
        return 0.0;
    }
    if x > ASYMPTOTIC_THRESHOLD {
        return log_asymptotic(x, 0.0);
    }
    log_series(x, 0.0)
}

/// `ln I1(x)` for `x >= 0`. Returns negative infinity at zero.
pub fn log_i1(x: f64) -> f64 {
    let x = x.abs();
    if x == 0.0 {
        return f64::NEG_INFINITY;
    }
    if x > ASYMPTOTIC_THRESHOLD {
        return log_asymptotic(x, 1.0);
    }
    log_series(x, 1.0)
}

/// Mean resultant length of a von Mises distribution with concentration
/// `kappa`: `A(κ) = I1(κ) / I0(κ)`, strictly increasing from 0 towards 1.
pub fn bessel_ratio(kappa: f64) -> f64 {
    if kappa == 0.0 {
        return 0.0;
    }
    (log_i1(kappa) - log_i0(kappa)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_i0_reference_values() {
        // I0(1) = 1.2660658777520082, I0(10) = 2815.716628466254
        assert_relative_eq!(log_i0(1.0), 1.266_065_877_752_008_2_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(log_i0(10.0), 2815.716_628_466_254_f64.ln(), epsilon = 1e-10);
        assert_eq!(log_i0(0.0), 0.0);
    }

    #[test]
    fn test_log_i1_reference_values() {
        // I1(1) = 0.5651591039924851, I1(10) = 2670.988303701255
        assert_relative_eq!(log_i1(1.0), 0.565_159_103_992_485_1_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(log_i1(10.0), 2670.988_303_701_255_f64.ln(), epsilon = 1e-10);
        assert_eq!(log_i1(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_large_argument_stays_finite() {
        let v = log_i0(700.0);
        assert!(v.is_finite());
        // ln I0(x) ≈ x − ½ ln(2πx) for large x
        let approx = 700.0 - 0.5 * (std::f64::consts::TAU * 700.0).ln();
        assert!((v - approx).abs() < 1e-3);
    }

    #[test]
    fn test_series_and_asymptotic_agree_at_threshold() {
        let x = ASYMPTOTIC_THRESHOLD;
        assert_relative_eq!(log_series(x, 0.0), log_asymptotic(x, 0.0), epsilon = 1e-6);
        assert_relative_eq!(log_series(x, 1.0), log_asymptotic(x, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_bessel_ratio_limits_and_monotone() {
        assert_eq!(bessel_ratio(0.0), 0.0);
        // A(κ) ≈ κ/2 for small κ
        assert_relative_eq!(bessel_ratio(1e-4), 5e-5, max_relative = 1e-6);
        let mut prev = 0.0;
        for i in 1..200 {
            let r = bessel_ratio(i as f64 * 3.5);
            assert!(r > prev && r < 1.0);
            prev = r;
        }
    }
}
