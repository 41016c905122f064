//! Persisted model layout: an ordered list of named numeric arrays.
//!
//! Every array carries its name, its shape and its values in row-major
//! order, so any fitted model (transition matrix, stationary distribution,
//! emission parameters, centroids) is stored the same way.

use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use ndarray::{Array, ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

/// One named array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArray {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl NamedArray {
    /// Rebuilds the array with its stored shape.
    pub fn to_array(&self) -> Result<ArrayD<f64>> {
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone())
            .with_context(|| format!("array {:?} does not match its shape", self.name))
    }
}

/// A fitted model as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedModel {
    /// What produced the arrays, e.g. `"msm"` or `"hmm-gaussian"`.
    pub kind: String,
    pub arrays: Vec<NamedArray>,
}

impl PersistedModel {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            arrays: Vec::new(),
        }
    }

    /// Appends raw row-major `data` with `shape`.
    pub fn push(&mut self, name: &str, shape: Vec<usize>, data: Vec<f64>) -> Result<()> {
        let expected: usize = shape.iter().product();
        ensure!(
            data.len() == expected,
            "array {name:?}: shape {shape:?} needs {expected} values, got {}",
            data.len()
        );
        if self.get(name).is_some() {
            bail!("duplicate array name {name:?}");
        }
        self.arrays.push(NamedArray {
            name: name.to_string(),
            shape,
            data,
        });
        Ok(())
    }

    /// Appends an ndarray in logical (row-major) order.
    pub fn push_array<D: Dimension>(&mut self, name: &str, array: &Array<f64, D>) -> Result<()> {
        self.push(name, array.shape().to_vec(), array.iter().copied().collect())
    }

    pub fn get(&self, name: &str) -> Option<&NamedArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        crate::input::write_json(path, self)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse model: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, array};

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut model = PersistedModel::new("hmm-gaussian");
        model
            .push_array("transition_matrix", &array![[0.9, 0.1], [0.2, 0.8]])
            .unwrap();
        model.push_array("stationary_distribution", &array![2.0 / 3.0, 1.0 / 3.0]).unwrap();
        let cov = Array3::from_shape_fn((2, 2, 2), |(k, i, j)| (k * 4 + i * 2 + j) as f64);
        model.push_array("covariances", &cov).unwrap();
        model.write(&path).unwrap();

        let back = PersistedModel::read(&path).unwrap();
        assert_eq!(back, model);
        let names: Vec<&str> = back.arrays.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["transition_matrix", "stationary_distribution", "covariances"]);
        let restored = back.get("covariances").unwrap().to_array().unwrap();
        assert_eq!(restored.shape(), &[2, 2, 2]);
        assert_eq!(restored[[1, 0, 1]], 5.0);
    }

    #[test]
    fn transposed_views_are_stored_row_major() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let mut model = PersistedModel::new("test");
        model.push_array("t", &a.t().to_owned()).unwrap();
        assert_eq!(model.get("t").unwrap().data, vec![1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn shape_and_name_checks() {
        let mut model = PersistedModel::new("test");
        assert!(model.push("a", vec![2, 2], vec![1.0; 3]).is_err());
        model.push("a", vec![1], vec![1.0]).unwrap();
        assert!(model.push("a", vec![1], vec![2.0]).is_err());
        assert!(model.get("missing").is_none());
    }
}
