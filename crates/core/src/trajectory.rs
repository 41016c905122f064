//! Continuous time-series container.

use serde::Serialize;

use crate::error::CoreError;

/// An ordered sequence of frames, each a fixed-length feature vector.
///
/// Stored row-major in a single buffer: frame `i` occupies
/// `data[i * n_features..(i + 1) * n_features]`. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    data: Vec<f64>,
    n_features: usize,
}

impl Trajectory {
    /// Builds a trajectory from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ZeroFeatures`] if `n_features == 0`.
    /// - [`CoreError::EmptyData`] if `data` is empty.
    /// - [`CoreError::RaggedData`] if `data.len()` is not a multiple of `n_features`.
    /// - [`CoreError::NonFiniteData`] if any value is NaN or infinite.
    pub fn new(data: Vec<f64>, n_features: usize) -> Result<Self, CoreError> {
        if n_features == 0 {
            return Err(CoreError::ZeroFeatures);
        }
        if data.is_empty() {
            return Err(CoreError::EmptyData);
        }
        if data.len() % n_features != 0 {
            return Err(CoreError::RaggedData {
                len: data.len(),
                n_features,
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::NonFiniteData);
        }
        Ok(Self { data, n_features })
    }

    /// Builds a trajectory from one slice per frame.
    ///
    /// # Errors
    ///
    /// Same as [`Trajectory::new`], plus [`CoreError::DimensionMismatch`]
    /// when rows differ in length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, CoreError> {
        let first = rows.first().ok_or(CoreError::EmptyData)?;
        let n_features = first.as_ref().len();
        if n_features == 0 {
            return Err(CoreError::ZeroFeatures);
        }
        let mut data = Vec::with_capacity(rows.len() * n_features);
        for (row, r) in rows.iter().enumerate() {
            let r = r.as_ref();
            if r.len() != n_features {
                return Err(CoreError::DimensionMismatch {
                    row,
                    expected: n_features,
                    got: r.len(),
                });
            }
            data.extend_from_slice(r);
        }
        Self::new(data, n_features)
    }

    /// Builds a one-feature trajectory from a scalar series.
    pub fn from_scalars(values: Vec<f64>) -> Result<Self, CoreError> {
        Self::new(values, 1)
    }

    /// Number of frames.
    pub fn n_frames(&self) -> usize {
        self.data.len() / self.n_features
    }

    /// Number of features per frame.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Feature vector of frame `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n_frames()`.
    pub fn frame(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_features..(i + 1) * self.n_features]
    }

    /// Iterator over frames in order.
    pub fn frames(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.n_features)
    }

    /// The flat row-major buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns every `stride`-th frame (stride 0 is treated as 1).
    pub fn strided(&self, stride: usize) -> Self {
        let stride = stride.max(1);
        let data: Vec<f64> = self
            .frames()
            .step_by(stride)
            .flat_map(|f| f.iter().copied())
            .collect();
        Self {
            data,
            n_features: self.n_features,
        }
    }

    /// Concatenates trajectories with a common feature count.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyData`] if `trajectories` is empty.
    /// - [`CoreError::DimensionMismatch`] if feature counts differ; `row`
    ///   is the index of the offending trajectory.
    pub fn concat(trajectories: &[Trajectory]) -> Result<Self, CoreError> {
        let n_features = check_common_features(trajectories)?;
        let data: Vec<f64> = trajectories
            .iter()
            .flat_map(|t| t.data.iter().copied())
            .collect();
        Ok(Self { data, n_features })
    }
}

/// Checks that `trajectories` is non-empty and every element shares one
/// feature count, returning it.
///
/// # Errors
///
/// - [`CoreError::EmptyData`] if the slice is empty.
/// - [`CoreError::DimensionMismatch`] naming the first trajectory whose
///   feature count differs from the first one.
pub fn check_common_features(trajectories: &[Trajectory]) -> Result<usize, CoreError> {
    let first = trajectories.first().ok_or(CoreError::EmptyData)?;
    let n_features = first.n_features();
    for (row, t) in trajectories.iter().enumerate() {
        if t.n_features() != n_features {
            return Err(CoreError::DimensionMismatch {
                row,
                expected: n_features,
                got: t.n_features(),
            });
        }
    }
    Ok(n_features)
}
