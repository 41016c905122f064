//! Error types for the msmkit-spline crate.

/// Error type for all fallible operations in the msmkit-spline crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SplineError {
    /// Returned when fewer than two knots are supplied.
    #[error("too few knots: got {n}, need at least 2")]
    TooFewKnots {
        /// Number of knots supplied.
        n: usize,
    },

    /// Returned when knot abscissae and ordinates differ in length.
    #[error("length mismatch: x has {x_len} elements, y has {y_len}")]
    LengthMismatch {
        /// Length of the abscissae.
        x_len: usize,
        /// Length of the ordinates.
        y_len: usize,
    },

    /// Returned when knot abscissae are not strictly increasing.
    #[error("knot abscissae not strictly increasing at index {index}")]
    NotIncreasing {
        /// First index `i` with `x[i] <= x[i - 1]`.
        index: usize,
    },

    /// Returned when a knot contains NaN or infinity.
    #[error("knots contain non-finite values")]
    NonFiniteData,

    /// Returned when a query lies outside the tabulated range.
    #[error("query {x} outside spline domain [{min}, {max}]")]
    OutOfDomain {
        /// The query value.
        x: f64,
        /// Smallest tabulated abscissa.
        min: f64,
        /// Largest tabulated abscissa.
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_too_few_knots() {
        let e = SplineError::TooFewKnots { n: 1 };
        assert_eq!(e.to_string(), "too few knots: got 1, need at least 2");
    }

    #[test]
    fn error_length_mismatch() {
        let e = SplineError::LengthMismatch { x_len: 3, y_len: 4 };
        assert_eq!(e.to_string(), "length mismatch: x has 3 elements, y has 4");
    }

    #[test]
    fn error_not_increasing() {
        let e = SplineError::NotIncreasing { index: 5 };
        assert_eq!(
            e.to_string(),
            "knot abscissae not strictly increasing at index 5"
        );
    }

    #[test]
    fn error_out_of_domain() {
        let e = SplineError::OutOfDomain {
            x: 1.5,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(e.to_string(), "query 1.5 outside spline domain [0, 1]");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<SplineError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<SplineError>();
    }
}
