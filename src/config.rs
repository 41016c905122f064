use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level msmkit configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsmkitConfig {
    /// Global RNG seed.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Clustering settings.
    #[serde(default)]
    pub cluster: ClusterToml,

    /// Hidden Markov model settings.
    #[serde(default)]
    pub hmm: HmmToml,

    /// Markov state model settings.
    #[serde(default)]
    pub msm: MsmToml,

    /// Transition-matrix sampler settings.
    #[serde(default)]
    pub mcmc: McmcToml,
}

impl MsmkitConfig {
    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config: {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterToml {
    #[serde(default = "default_cluster_method")]
    pub method: String,
    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,
    #[serde(default)]
    pub d_min: Option<f64>,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default)]
    pub period: Option<f64>,
}

impl Default for ClusterToml {
    fn default() -> Self {
        Self {
            method: default_cluster_method(),
            n_clusters: default_n_clusters(),
            d_min: None,
            metric: default_metric(),
            period: None,
        }
    }
}

fn default_cluster_method() -> String {
    "kcenters".to_string()
}
fn default_n_clusters() -> usize {
    10
}
fn default_metric() -> String {
    "euclidean".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HmmToml {
    #[serde(default = "default_n_states")]
    pub n_states: usize,
    #[serde(default = "default_emission")]
    pub emission: String,
    #[serde(default = "default_covariance")]
    pub covariance: String,
    #[serde(default = "default_hmm_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_hmm_tol")]
    pub tol: f64,
    #[serde(default = "default_min_covar")]
    pub min_covar: f64,
    #[serde(default = "default_estimator")]
    pub estimator: String,
    #[serde(default = "default_persistence")]
    pub persistence: f64,
    #[serde(default = "default_stride")]
    pub init_stride: usize,
}

impl Default for HmmToml {
    fn default() -> Self {
        Self {
            n_states: default_n_states(),
            emission: default_emission(),
            covariance: default_covariance(),
            max_iter: default_hmm_max_iter(),
            tol: default_hmm_tol(),
            min_covar: default_min_covar(),
            estimator: default_estimator(),
            persistence: default_persistence(),
            init_stride: default_stride(),
        }
    }
}

fn default_n_states() -> usize {
    2
}
fn default_emission() -> String {
    "gaussian".to_string()
}
fn default_covariance() -> String {
    "diagonal".to_string()
}
fn default_hmm_max_iter() -> usize {
    100
}
fn default_hmm_tol() -> f64 {
    1e-4
}
fn default_min_covar() -> f64 {
    1e-3
}
fn default_estimator() -> String {
    "reversible".to_string()
}
fn default_persistence() -> f64 {
    0.9
}
fn default_stride() -> usize {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsmToml {
    #[serde(default = "default_lag")]
    pub lag: usize,
    #[serde(default = "default_estimator")]
    pub estimator: String,
    #[serde(default = "default_true")]
    pub sliding_window: bool,
    #[serde(default)]
    pub prior: f64,
}

impl Default for MsmToml {
    fn default() -> Self {
        Self {
            lag: default_lag(),
            estimator: default_estimator(),
            sliding_window: true,
            prior: 0.0,
        }
    }
}

fn default_lag() -> usize {
    1
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct McmcToml {
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default = "default_proposal_scale")]
    pub proposal_scale: f64,
    #[serde(default = "default_n_steps")]
    pub n_steps: usize,
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    #[serde(default = "default_true")]
    pub reversible: bool,
}

impl Default for McmcToml {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            proposal_scale: default_proposal_scale(),
            n_steps: default_n_steps(),
            burn_in: default_burn_in(),
            reversible: true,
        }
    }
}

fn default_n_samples() -> usize {
    100
}
fn default_proposal_scale() -> f64 {
    0.01
}
fn default_n_steps() -> usize {
    100
}
fn default_burn_in() -> usize {
    1000
}
