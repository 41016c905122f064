//! MSM command: estimate a Markov state model from label sequences.

use anyhow::{Context, Result};
use ndarray::Array1;
use tracing::{debug, info, info_span};

use msmkit_msm::{MarkovStateModel, fit_msm};

use crate::cli::MsmArgs;
use crate::config::MsmkitConfig;
use crate::persist::PersistedModel;
use crate::{convert, input};

/// Run the MSM estimation pipeline.
pub fn run(args: MsmArgs) -> Result<()> {
    let _cmd = info_span!("msm").entered();
    let mut config = MsmkitConfig::load(args.common.config.as_deref())?;
    if let Some(lag) = args.lag {
        config.msm.lag = lag;
    }
    let msm_cfg = convert::build_msm_config(&config.msm)?;

    let seqs = input::read_sequences(&args.common.input)?;
    info!(n_sequences = seqs.len(), "label sequences loaded");

    let msm = fit_msm(&seqs, &msm_cfg).context("MSM estimation failed")?;
    info!(
        n_states = msm.n_states(),
        n_transitions = msm.counts().total(),
        "MSM estimated"
    );

    let model = persist_msm(&msm)?;
    model.write(&args.common.output)?;
    info!(path = %args.common.output.display(), "model written");
    Ok(())
}

/// Arrays of an MSM: transition matrix, stationary distribution, counts,
/// original labels of the states and, for reversible models, timescales.
pub fn persist_msm(msm: &MarkovStateModel) -> Result<PersistedModel> {
    let mut model = PersistedModel::new("msm");
    model.push_array("transition_matrix", msm.transition_matrix().as_array())?;
    model.push_array("stationary_distribution", msm.populations())?;
    model.push_array("counts", &msm.counts().to_f64())?;
    let labels: Array1<f64> = msm.labels().into_iter().map(|l| l as f64).collect();
    model.push_array("state_labels", &labels)?;
    match msm.timescales() {
        Ok(ts) => model.push_array("timescales", &ts)?,
        Err(e) => debug!(error = %e, "timescales not written"),
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msmkit_msm::{MsmConfig, TransitionEstimator};

    #[test]
    fn reversible_model_has_timescales() {
        let seqs = vec![vec![0, 0, 1, 1, 0, 1, 1, 0, 0, 0, 1]];
        let msm = fit_msm(&seqs, &MsmConfig::new()).unwrap();
        let model = persist_msm(&msm).unwrap();
        assert_eq!(model.get("transition_matrix").unwrap().shape, vec![2, 2]);
        assert_eq!(model.get("state_labels").unwrap().data, vec![0.0, 1.0]);
        assert_eq!(model.get("timescales").unwrap().shape, vec![1]);
    }

    #[test]
    fn irreversible_model_skips_timescales() {
        let cycle: Vec<usize> = (0..60).map(|i| i % 3).collect();
        let cfg = MsmConfig::new().with_estimator(TransitionEstimator::NonReversible);
        let msm = fit_msm(&[cycle], &cfg).unwrap();
        let model = persist_msm(&msm).unwrap();
        assert!(model.get("timescales").is_none());
        assert_eq!(model.get("counts").unwrap().data.iter().sum::<f64>(), 59.0);
    }
}
