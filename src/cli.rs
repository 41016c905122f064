use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// msmkit discrete-state kinetic modelling toolkit.
#[derive(Parser)]
#[command(
    name = "msmkit",
    version,
    about = "Clustering, hidden Markov models and Markov state models for time series"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Cluster trajectories into discrete states.
    Cluster(ClusterArgs),
    /// Fit a hidden Markov model to trajectories.
    Hmm(HmmArgs),
    /// Fit a Markov state model to label sequences.
    Msm(MsmArgs),
    /// Sample transition matrices from the posterior of label-sequence counts.
    Sample(SampleArgs),
}

/// Options shared by every subcommand.
#[derive(clap::Args)]
pub struct CommonArgs {
    /// Path to TOML configuration file. Built-in defaults when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input JSON file.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSON file.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override the global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

/// Arguments for the `cluster` subcommand.
#[derive(clap::Args)]
pub struct ClusterArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Also write the per-frame labels (`[[usize]]`) to this path.
    #[arg(long)]
    pub labels: Option<PathBuf>,
}

/// Arguments for the `hmm` subcommand.
#[derive(clap::Args)]
pub struct HmmArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Override the number of hidden states from config.
    #[arg(short = 'k', long)]
    pub n_states: Option<usize>,

    /// Also write the Viterbi state paths (`[[usize]]`) to this path.
    #[arg(long)]
    pub labels: Option<PathBuf>,
}

/// Arguments for the `msm` subcommand.
#[derive(clap::Args)]
pub struct MsmArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Override the lag time from config.
    #[arg(short, long)]
    pub lag: Option<usize>,
}

/// Arguments for the `sample` subcommand.
#[derive(clap::Args)]
pub struct SampleArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Override the number of samples from config.
    #[arg(short = 'n', long)]
    pub n_samples: Option<usize>,
}
