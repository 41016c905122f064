//! Scalar numerical helpers shared by the estimators.
//!
//! All probability work in the HMM and MSM crates is done in log space;
//! these are the reductions it relies on.

/// Numerically stable `ln(exp(a) + exp(b))`.
///
/// Handles either argument being negative infinity.
#[inline]
pub fn logaddexp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

/// Numerically stable `ln(Σ exp(xᵢ))`.
///
/// Returns negative infinity for an empty slice or when every element is
/// negative infinity. A single element is returned unchanged.
pub fn logsumexp(xs: &[f64]) -> f64 {
    match xs.len() {
        0 => return f64::NEG_INFINITY,
        1 => return xs[0],
        _ => {}
    }
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if max == f64::INFINITY {
        return f64::INFINITY;
    }
    let sum: f64 = xs.iter().map(|&x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Normalizes `values` in place so they sum to one.
///
/// Returns the original sum, or `None` (leaving `values` untouched) when the
/// sum is not strictly positive and finite.
pub fn normalize_in_place(values: &mut [f64]) -> Option<f64> {
    let sum: f64 = values.iter().sum();
    if !(sum.is_finite() && sum > 0.0) {
        return None;
    }
    for v in values.iter_mut() {
        *v /= sum;
    }
    Some(sum)
}

/// Arithmetic mean of a slice. Returns 0.0 if empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f64 = data.iter().sum();
    sum / data.len() as f64
}

/// Population variance (N denominator). Returns 0.0 if empty.
///
/// The population form is what the Gaussian maximum-likelihood estimate uses.
pub fn population_variance(data: &[f64]) -> f64 {
    let n = data.len();
    if n == 0 {
        return 0.0;
    }
    let m = mean(data);
    data.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / n as f64
}

/// Wraps an angle into `[-π, π)`.
#[inline]
pub fn wrap_angle(theta: f64) -> f64 {
    use std::f64::consts::PI;
    (theta + PI).rem_euclid(2.0 * PI) - PI
}
