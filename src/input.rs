//! JSON input and output for the command-line driver.
//!
//! Trajectories are `[[[f64]]]` (trajectory, frame, feature); label
//! sequences are `[[usize]]`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use msmkit_core::Trajectory;
use serde::Serialize;
use serde::de::DeserializeOwned;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse JSON: {}", path.display()))
}

/// Reads trajectories stored as nested arrays.
pub fn read_trajectories(path: &Path) -> Result<Vec<Trajectory>> {
    let raw: Vec<Vec<Vec<f64>>> = read_json(path)?;
    if raw.is_empty() {
        bail!("{} contains no trajectories", path.display());
    }
    raw.iter()
        .enumerate()
        .map(|(i, rows)| {
            Trajectory::from_rows(rows).with_context(|| format!("trajectory {i} is malformed"))
        })
        .collect()
}

/// Reads discrete label sequences.
pub fn read_sequences(path: &Path) -> Result<Vec<Vec<usize>>> {
    let seqs: Vec<Vec<usize>> = read_json(path)?;
    if seqs.iter().all(Vec::is_empty) {
        bail!("{} contains no labels", path.display());
    }
    Ok(seqs)
}

/// Writes `value` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("failed to write JSON: {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))
}
