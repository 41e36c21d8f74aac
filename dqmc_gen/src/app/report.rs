use super::artifacts::Artifacts;
use crate::config::Settings;
use hubbard::Observable;
use std::path::PathBuf;
use tracing::info;

pub fn report_settings(settings: &Settings) {
    info!("Generating simulation files:");
    info!("  Lattice: {}x{} (N = {})", settings.nx, settings.ny, settings.n());
    info!(
        "  U = {}, t' = {}, mu = {}, nflux = {}",
        settings.u, settings.tp, settings.mu, settings.nflux
    );
    info!(
        "  dt = {}, L = {}, beta = {:.6}",
        settings.dt,
        settings.l,
        settings.dt * settings.l as f64
    );
    info!("  Seed: {}, files: {}", settings.seed, settings.nfiles);
}

pub fn report_artifacts(artifacts: &Artifacts) {
    info!("\nEquivalence classes:");
    for obs in Observable::ALL {
        match artifacts.maps.get(obs) {
            Some(map) => info!(
                "  {:>8}: {:>8} tuples -> {:>6} classes",
                format!("map_{}", obs.name()),
                map.num_tuples(),
                map.num_classes()
            ),
            None => info!("  {:>8}: not defined", format!("map_{}", obs.name())),
        }
    }
    let kind = if artifacts.is_complex() {
        "complex"
    } else {
        "real"
    };
    info!("Propagators are {}", kind);
}

pub fn report_batch(paths: &[PathBuf]) {
    match paths {
        [] => {}
        [only] => info!("created simulation files: {}", only.display()),
        [first, .., last] => info!(
            "created simulation files: {} ... {}",
            first.display(),
            last.display()
        ),
    }
}
