//! Pure conversion functions: TOML config structs -> crate API config types.

use anyhow::{Context, Result, bail};

use msmkit_cluster::{Clustering, KCenters, MetricKind, Periodic, RegularSpatial};
use msmkit_core::{Estimator, Trajectory};
use msmkit_hmm::{CovarianceType, EmissionKind, HmmConfig};
use msmkit_mcmc::SamplerConfig;
use msmkit_msm::{MsmConfig, TransitionEstimator};

use crate::config::*;

/// Clustering estimator selected at run time.
#[derive(Debug, Clone)]
pub enum ClusterMethod {
    KCenters(KCenters<MetricKind>),
    Regular(RegularSpatial<MetricKind>),
}

impl ClusterMethod {
    /// Fits the selected estimator.
    pub fn fit(&self, data: &[Trajectory]) -> Result<Clustering<MetricKind>> {
        match self {
            ClusterMethod::KCenters(est) => est.fit(data).context("k-centers clustering failed"),
            ClusterMethod::Regular(est) => est.fit(data).context("regular spatial clustering failed"),
        }
    }
}

/// Parses a metric name; `period` applies to `"periodic"` only (default 2π).
pub fn parse_metric(s: &str, period: Option<f64>) -> Result<MetricKind> {
    match s.to_lowercase().as_str() {
        "euclidean" => Ok(MetricKind::Euclidean),
        "manhattan" => Ok(MetricKind::Manhattan),
        "periodic" => Ok(MetricKind::Periodic(
            period.map_or_else(Periodic::default, Periodic::new),
        )),
        other => bail!("unknown metric: {other:?}"),
    }
}

/// Parses a transition estimator name.
pub fn parse_estimator(s: &str) -> Result<TransitionEstimator> {
    match s.to_lowercase().replace(['-', '_'], "").as_str() {
        "reversible" => Ok(TransitionEstimator::Reversible),
        "transpose" => Ok(TransitionEstimator::Transpose),
        "nonreversible" => Ok(TransitionEstimator::NonReversible),
        other => bail!("unknown transition estimator: {other:?}"),
    }
}

/// Parses an emission family name.
pub fn parse_emission(s: &str) -> Result<EmissionKind> {
    match s.to_lowercase().replace(['-', '_'], "").as_str() {
        "gaussian" => Ok(EmissionKind::Gaussian),
        "vonmises" => Ok(EmissionKind::VonMises),
        other => bail!("unknown emission family: {other:?}"),
    }
}

/// Parses a covariance structure name.
pub fn parse_covariance(s: &str) -> Result<CovarianceType> {
    match s.to_lowercase().as_str() {
        "diagonal" | "diag" => Ok(CovarianceType::Diagonal),
        "full" => Ok(CovarianceType::Full),
        other => bail!("unknown covariance type: {other:?}"),
    }
}

/// Builds the clustering estimator from the TOML cluster configuration.
///
/// `"regular"` requires `d_min`; an optional global seed is forwarded to
/// k-centers.
pub fn build_cluster_method(cluster: &ClusterToml, seed: Option<u64>) -> Result<ClusterMethod> {
    let metric = parse_metric(&cluster.metric, cluster.period)?;
    match cluster.method.to_lowercase().as_str() {
        "kcenters" | "k-centers" => {
            let mut est = KCenters::new(cluster.n_clusters).with_metric(metric);
            if let Some(s) = seed {
                est = est.with_seed(s);
            }
            Ok(ClusterMethod::KCenters(est))
        }
        "regular" | "regular-spatial" => {
            let Some(d_min) = cluster.d_min else {
                bail!("regular spatial clustering needs [cluster].d_min");
            };
            Ok(ClusterMethod::Regular(RegularSpatial::new(d_min).with_metric(metric)))
        }
        other => bail!("unknown clustering method: {other:?}"),
    }
}

/// Builds an [`HmmConfig`] from the TOML HMM configuration.
pub fn build_hmm_config(hmm: &HmmToml, seed: Option<u64>) -> Result<HmmConfig> {
    let mut cfg = HmmConfig::new(hmm.n_states)
        .with_emission(parse_emission(&hmm.emission)?)
        .with_covariance_type(parse_covariance(&hmm.covariance)?)
        .with_max_iter(hmm.max_iter)
        .with_tol(hmm.tol)
        .with_min_covar(hmm.min_covar)
        .with_estimator(parse_estimator(&hmm.estimator)?)
        .with_persistence(hmm.persistence)
        .with_init_stride(hmm.init_stride);
    if let Some(s) = seed {
        cfg = cfg.with_seed(s);
    }
    cfg.validate().context("invalid [hmm] configuration")?;
    Ok(cfg)
}

/// Builds an [`MsmConfig`] from the TOML MSM configuration.
pub fn build_msm_config(msm: &MsmToml) -> Result<MsmConfig> {
    let cfg = MsmConfig::new()
        .with_lag(msm.lag)
        .with_estimator(parse_estimator(&msm.estimator)?)
        .with_sliding_window(msm.sliding_window)
        .with_prior(msm.prior);
    cfg.validate().context("invalid [msm] configuration")?;
    Ok(cfg)
}

/// Builds a [`SamplerConfig`] from the TOML MCMC configuration.
pub fn build_sampler_config(mcmc: &McmcToml, seed: Option<u64>) -> Result<SamplerConfig> {
    let mut cfg = SamplerConfig::new()
        .with_n_samples(mcmc.n_samples)
        .with_proposal_scale(mcmc.proposal_scale)
        .with_n_steps(mcmc.n_steps)
        .with_burn_in(mcmc.burn_in)
        .with_reversible(mcmc.reversible);
    if let Some(s) = seed {
        cfg = cfg.with_seed(s);
    }
    cfg.validate().context("invalid [mcmc] configuration")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(parse_metric("Euclidean", None).unwrap(), MetricKind::Euclidean);
        assert_eq!(
            parse_metric("periodic", Some(360.0)).unwrap(),
            MetricKind::Periodic(Periodic::new(360.0))
        );
        assert_eq!(parse_estimator("non_reversible").unwrap(), TransitionEstimator::NonReversible);
        assert_eq!(parse_emission("von-mises").unwrap(), EmissionKind::VonMises);
        assert_eq!(parse_covariance("diag").unwrap(), CovarianceType::Diagonal);
        assert!(parse_metric("cosine", None).is_err());
        assert!(parse_estimator("bayesian").is_err());
    }

    #[test]
    fn regular_needs_cutoff() {
        let toml = ClusterToml {
            method: "regular".to_string(),
            ..ClusterToml::default()
        };
        assert!(build_cluster_method(&toml, None).is_err());
        let toml = ClusterToml {
            d_min: Some(0.3),
            ..toml
        };
        assert!(matches!(
            build_cluster_method(&toml, None).unwrap(),
            ClusterMethod::Regular(_)
        ));
    }

    #[test]
    fn seed_is_forwarded() {
        let hmm = build_hmm_config(&HmmToml::default(), Some(9)).unwrap();
        assert_eq!(hmm.seed(), Some(9));
        let mcmc = build_sampler_config(&McmcToml::default(), Some(3)).unwrap();
        assert_eq!(mcmc.seed(), Some(3));
        let ClusterMethod::KCenters(kc) = build_cluster_method(&ClusterToml::default(), Some(4)).unwrap()
        else {
            panic!("expected k-centers");
        };
        assert_eq!(kc.seed(), Some(4));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let hmm = HmmToml {
            persistence: 1.5,
            ..HmmToml::default()
        };
        assert!(build_hmm_config(&hmm, None).is_err());
        let msm = MsmToml {
            lag: 0,
            ..MsmToml::default()
        };
        assert!(build_msm_config(&msm).is_err());
    }
}
