mod cli;
mod cluster_cmd;
mod config;
mod convert;
mod hmm_cmd;
mod input;
mod logging;
mod msm_cmd;
mod persist;
mod sample_cmd;

use std::process;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Cluster(args) => cluster_cmd::run(args),
        Command::Hmm(args) => hmm_cmd::run(args),
        Command::Msm(args) => msm_cmd::run(args),
        Command::Sample(args) => sample_cmd::run(args),
    }
}
