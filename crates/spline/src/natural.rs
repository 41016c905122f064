//! Natural cubic spline interpolation.

use crate::error::SplineError;

/// Interpolating cubic spline with zero second derivative at both ends.
///
/// Stores the knots and their second derivatives; evaluation is a binary
/// search for the bracketing interval followed by the cubic formula.
#[derive(Debug, Clone)]
pub struct NaturalSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    y2: Vec<f64>,
}

impl NaturalSpline {
    /// Fits the spline through `(x[i], y[i])`.
    ///
    /// # Errors
    ///
    /// - [`SplineError::LengthMismatch`] if `x` and `y` differ in length.
    /// - [`SplineError::TooFewKnots`] if fewer than two knots are given.
    /// - [`SplineError::NonFiniteData`] if any knot is NaN or infinite.
    /// - [`SplineError::NotIncreasing`] if `x` is not strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        let n = x.len();
        if n < 2 {
            return Err(SplineError::TooFewKnots { n });
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SplineError::NonFiniteData);
        }
        if let Some(index) = (1..n).find(|&i| x[i] <= x[i - 1]) {
            return Err(SplineError::NotIncreasing { index });
        }

        let y2 = second_derivatives(&x, &y);
        Ok(Self { x, y, y2 })
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; a spline has at least two knots.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Knot abscissae.
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// Knot ordinates.
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Second derivatives at the knots.
    pub fn second_derivatives(&self) -> &[f64] {
        &self.y2
    }

    /// Tabulated range `(x_min, x_max)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Evaluates the spline at `q`.
    ///
    /// # Errors
    ///
    /// Returns [`SplineError::OutOfDomain`] if `q` is outside [`domain`](Self::domain)
    /// or NaN.
    pub fn eval(&self, q: f64) -> Result<f64, SplineError> {
        let (min, max) = self.domain();
        if !(q >= min && q <= max) {
            return Err(SplineError::OutOfDomain { x: q, min, max });
        }
        let n = self.x.len();
        let hi = self.x.partition_point(|&k| k <= q).clamp(1, n - 1);
        let lo = hi - 1;

        let h = self.x[hi] - self.x[lo];
        let a = (self.x[hi] - q) / h;
        let b = (q - self.x[lo]) / h;
        Ok(a * self.y[lo]
            + b * self.y[hi]
            + ((a * a * a - a) * self.y2[lo] + (b * b * b - b) * self.y2[hi]) * h * h / 6.0)
    }
}

/// Solves the tridiagonal system for knot second derivatives with
/// `y2[0] = y2[n-1] = 0` (Thomas algorithm).
fn second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut y2 = vec![0.0; n];
    if n < 3 {
        return y2;
    }
    let m = n - 2;
    let mut c_prime = vec![0.0; m];
    let mut d_prime = vec![0.0; m];

    for row in 0..m {
        let i = row + 1;
        let h_lo = x[i] - x[i - 1];
        let h_hi = x[i + 1] - x[i];
        let diag = 2.0 * (h_lo + h_hi);
        let rhs = 6.0 * ((y[i + 1] - y[i]) / h_hi - (y[i] - y[i - 1]) / h_lo);
        if row == 0 {
            c_prime[row] = h_hi / diag;
            d_prime[row] = rhs / diag;
        } else {
            let denom = diag - h_lo * c_prime[row - 1];
            c_prime[row] = h_hi / denom;
            d_prime[row] = (rhs - h_lo * d_prime[row - 1]) / denom;
        }
    }

    y2[m] = d_prime[m - 1];
    for row in (0..m - 1).rev() {
        y2[row + 1] = d_prime[row] - c_prime[row] * y2[row + 2];
    }
    y2
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_interpolates_knots() {
        let x = vec![0.0, 0.5, 1.7, 2.0, 3.1];
        let y = vec![1.0, -0.5, 2.0, 0.3, 4.0];
        let s = NaturalSpline::new(x.clone(), y.clone()).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert_abs_diff_eq!(s.eval(*xi).unwrap(), *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reproduces_linear_function() {
        let x: Vec<f64> = (0..6).map(|i| i as f64 * 0.7).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 1.0).collect();
        let s = NaturalSpline::new(x, y).unwrap();
        assert_abs_diff_eq!(s.eval(1.234).unwrap(), 3.0 * 1.234 - 1.0, epsilon = 1e-12);
        for v in s.second_derivatives() {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_natural_end_conditions() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let s = NaturalSpline::new(x, y).unwrap();
        let y2 = s.second_derivatives();
        assert_eq!(y2[0], 0.0);
        assert_eq!(y2[9], 0.0);
        // Interior second derivatives approach 2 away from the ends.
        assert!((y2[5] - 2.0).abs() < 0.05);
    }

    #[test]
    fn test_smooth_function_accuracy() {
        let x: Vec<f64> = (0..=100).map(|i| i as f64 * 0.0628).collect();
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let s = NaturalSpline::new(x, y).unwrap();
        for i in 0..200 {
            let q = 0.3 + i as f64 * 0.028;
            assert_abs_diff_eq!(s.eval(q).unwrap(), q.sin(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_two_knots_is_linear() {
        let s = NaturalSpline::new(vec![0.0, 2.0], vec![1.0, 5.0]).unwrap();
        assert_abs_diff_eq!(s.eval(0.5).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_domain() {
        let s = NaturalSpline::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert!(matches!(
            s.eval(2.5),
            Err(SplineError::OutOfDomain { max, .. }) if max == 2.0
        ));
        assert!(s.eval(f64::NAN).is_err());
        assert!(s.eval(-0.1).is_err());
    }

    #[test]
    fn test_invalid_knots() {
        assert!(matches!(
            NaturalSpline::new(vec![0.0], vec![0.0]),
            Err(SplineError::TooFewKnots { n: 1 })
        ));
        assert!(matches!(
            NaturalSpline::new(vec![0.0, 1.0], vec![0.0]),
            Err(SplineError::LengthMismatch { x_len: 2, y_len: 1 })
        ));
        assert!(matches!(
            NaturalSpline::new(vec![0.0, 1.0, 1.0], vec![0.0, 1.0, 2.0]),
            Err(SplineError::NotIncreasing { index: 2 })
        ));
        assert!(matches!(
            NaturalSpline::new(vec![0.0, f64::INFINITY], vec![0.0, 1.0]),
            Err(SplineError::NonFiniteData)
        ));
    }
}
