use super::artifacts::Artifacts;
use super::assemble::{assemble, Replica};
use crate::config::Settings;
use color_eyre::eyre::{Result, WrapErr};
use hubbard::RngState;
use std::path::PathBuf;
use tracing::{debug, info};

/// Output paths of every replica, in replica order.
pub fn file_names(settings: &Settings) -> Vec<PathBuf> {
    match (&settings.filename, settings.nfiles) {
        (Some(name), 1) => vec![PathBuf::from(name)],
        _ => (0..settings.nfiles)
            .map(|k| PathBuf::from(format!("{}_{}.json", settings.prefix, k)))
            .collect(),
    }
}

/// Write `Nfiles` simulation files that differ only in their random stream.
///
/// Replica 0 draws its field straight from the seeded generator; replica
/// `k` starts from the seeded state jumped `k` times, so the streams never
/// overlap. Files are written in order and a failure leaves the earlier
/// replicas on disk.
pub fn create_batch(settings: &Settings, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
    let paths = file_names(settings);
    let (slices, sites) = (settings.l, artifacts.lattice.n());

    let mut stream = RngState::seed(settings.seed);
    let first = Replica::draw(&stream, slices, sites);
    let mut container = assemble(settings, artifacts, &first);

    for (k, path) in paths.iter().enumerate() {
        if k > 0 {
            stream.jump();
            Replica::draw(&stream, slices, sites).apply(&mut container)?;
        }
        container
            .save(path, settings.overwrite)
            .wrap_err_with(|| format!("Failed to write replica {}", k))?;
        debug!("Replica {} written to {}", k, path.display());
    }

    info!("Created {} simulation file(s)", paths.len());
    Ok(paths)
}
