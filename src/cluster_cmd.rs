//! Cluster command: discretise trajectories into states.

use anyhow::{Context, Result};
use tracing::{info, info_span};

use msmkit_core::Fitted;

use crate::cli::ClusterArgs;
use crate::config::MsmkitConfig;
use crate::persist::PersistedModel;
use crate::{convert, input};

/// Run the clustering pipeline.
pub fn run(args: ClusterArgs) -> Result<()> {
    let _cmd = info_span!("cluster").entered();
    let config = MsmkitConfig::load(args.common.config.as_deref())?;
    let seed = args.common.seed.or(config.seed);
    let method = convert::build_cluster_method(&config.cluster, seed)?;

    let data = input::read_trajectories(&args.common.input)?;
    info!(
        path = %args.common.input.display(),
        n_trajectories = data.len(),
        "trajectories loaded"
    );

    let clustering = method.fit(&data)?;
    let inertia = -clustering.score(&data).context("scoring the clustering failed")?;
    info!(
        n_clusters = clustering.n_clusters(),
        max_radius = clustering.max_radius(),
        inertia,
        "clustering complete"
    );

    let centroids = clustering.centroids();
    let mut model = PersistedModel::new("clustering");
    model.push(
        "centroids",
        vec![centroids.n_frames(), centroids.n_features()],
        centroids.as_slice().to_vec(),
    )?;
    model.write(&args.common.output)?;
    info!(path = %args.common.output.display(), "model written");

    if let Some(path) = args.labels {
        input::write_json(&path, clustering.labels())?;
        info!(path = %path.display(), "labels written");
    }
    Ok(())
}
