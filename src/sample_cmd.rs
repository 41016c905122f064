//! Sample command: Bayesian posterior samples of the transition matrix.

use anyhow::{Context, Result, bail};
use tracing::{info, info_span};

use msmkit_mcmc::sample_transition_matrices;
use msmkit_msm::fit_msm;

use crate::cli::SampleArgs;
use crate::config::MsmkitConfig;
use crate::persist::PersistedModel;
use crate::{convert, input};

/// Run the transition-matrix sampler.
///
/// Labels are compacted and counted exactly as in the `msm` command; the
/// samples are written as one `n_samples × K × K` array.
pub fn run(args: SampleArgs) -> Result<()> {
    let _cmd = info_span!("sample").entered();
    let mut config = MsmkitConfig::load(args.common.config.as_deref())?;
    if let Some(n) = args.n_samples {
        config.mcmc.n_samples = n;
    }
    let seed = args.common.seed.or(config.seed);
    let msm_cfg = convert::build_msm_config(&config.msm)?;
    let sampler_cfg = convert::build_sampler_config(&config.mcmc, seed)?;

    let seqs = input::read_sequences(&args.common.input)?;
    let msm = fit_msm(&seqs, &msm_cfg).context("counting transitions failed")?;
    let k = msm.n_states();
    info!(n_states = k, n_transitions = msm.counts().total(), "counts built");

    let mut samples = sample_transition_matrices(msm.counts(), &sampler_cfg)
        .context("failed to start the sampler")?;
    let mut data = Vec::with_capacity(sampler_cfg.n_samples() * k * k);
    let mut n = 0;
    for t in samples.by_ref() {
        data.extend(t.as_array().iter().copied());
        n += 1;
    }
    if n < sampler_cfg.n_samples() {
        bail!(
            "sampler stopped after {n} of {} samples",
            sampler_cfg.n_samples()
        );
    }
    info!(
        n_samples = n,
        acceptance_rate = samples.acceptance_rate(),
        "sampling complete"
    );

    let mut model = PersistedModel::new("transition-samples");
    model.push_array("transition_matrix", msm.transition_matrix().as_array())?;
    model.push("transition_matrices", vec![n, k, k], data)?;
    model.push("acceptance_rate", vec![1], vec![samples.acceptance_rate()])?;
    model.write(&args.common.output)?;
    info!(path = %args.common.output.display(), "samples written");
    Ok(())
}
