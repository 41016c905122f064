//! HMM command: fit a hidden Markov model to trajectories.

use anyhow::{Context, Result};
use ndarray::Array1;
use tracing::{debug, info, info_span, warn};

use msmkit_core::Fitted;
use msmkit_hmm::{Covariances, FitStatus, FittedHmm, fit_hmm};

use crate::cli::HmmArgs;
use crate::config::MsmkitConfig;
use crate::persist::PersistedModel;
use crate::{convert, input};

/// Run the HMM fitting pipeline.
pub fn run(args: HmmArgs) -> Result<()> {
    let _cmd = info_span!("hmm").entered();
    let mut config = MsmkitConfig::load(args.common.config.as_deref())?;
    if let Some(k) = args.n_states {
        config.hmm.n_states = k;
    }
    let seed = args.common.seed.or(config.seed);
    let hmm_cfg = convert::build_hmm_config(&config.hmm, seed)?;

    let data = input::read_trajectories(&args.common.input)?;
    info!(n_trajectories = data.len(), "trajectories loaded");

    let hmm = fit_hmm(&data, &hmm_cfg).context("HMM fitting failed")?;
    if let Some(report) = hmm.fit_report() {
        if report.status() == FitStatus::MaxIterReached {
            warn!(n_iter = report.n_iter(), "HMM did not converge; writing last iterate");
        }
        info!(
            n_iter = report.n_iter(),
            log_likelihood = report.final_log_likelihood(),
            "HMM fitted"
        );
    }

    let model = persist_hmm(&hmm)?;
    model.write(&args.common.output)?;
    info!(path = %args.common.output.display(), "model written");

    if let Some(path) = args.labels {
        let paths = hmm.transform(&data).context("Viterbi decoding failed")?;
        input::write_json(&path, &paths)?;
        info!(path = %path.display(), "state paths written");
    }
    Ok(())
}

/// Arrays of an HMM: transitions, populations, start probabilities,
/// emission parameters, the log-likelihood trace and, when the hidden chain
/// is reversible, its timescales.
pub fn persist_hmm(hmm: &FittedHmm) -> Result<PersistedModel> {
    let kind = match hmm {
        FittedHmm::Gaussian(_) => "hmm-gaussian",
        FittedHmm::VonMises(_) => "hmm-von-mises",
    };
    let mut model = PersistedModel::new(kind);
    model.push_array("transition_matrix", hmm.transition_matrix().as_array())?;
    model.push_array("stationary_distribution", &hmm.populations()?)?;
    model.push_array("start_probabilities", hmm.start_probabilities())?;
    match hmm {
        FittedHmm::Gaussian(h) => {
            model.push_array("means", h.emission().means())?;
            match h.emission().covariances() {
                Covariances::Diagonal(v) => model.push_array("covariances", v)?,
                Covariances::Full(c) => model.push_array("covariances", c)?,
            }
        }
        FittedHmm::VonMises(h) => {
            model.push_array("means", h.emission().means())?;
            model.push_array("concentrations", h.emission().kappas())?;
        }
    }
    if let Some(report) = hmm.fit_report() {
        let trace = Array1::from(report.log_likelihoods().to_vec());
        model.push_array("log_likelihood", &trace)?;
    }
    match hmm.timescales() {
        Ok(ts) => model.push_array("timescales", &ts)?,
        Err(e) => debug!(error = %e, "timescales not written"),
    }
    Ok(model)
}
