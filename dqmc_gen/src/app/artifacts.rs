use crate::config::Settings;
use color_eyre::eyre::Result;
use hubbard::{integral_kernel, Hopping, Lattice, OnSite, SymmetryMaps};
use nalgebra::DMatrix;
use tracing::info;

/// Everything in a simulation file that does not depend on the replica.
///
/// Built once per batch and borrowed by every replica.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub lattice: Lattice,
    pub maps: SymmetryMaps,
    pub hopping: Hopping,
    pub on_site: OnSite,
    pub kernel: DMatrix<f64>,
}

impl Artifacts {
    pub fn build(settings: &Settings) -> Result<Self> {
        let lattice = settings.lattice();
        info!(
            "Building symmetry maps on {}x{} lattice ({} bonds per site, trans_sym = {})",
            lattice.nx,
            lattice.ny,
            lattice.bps(),
            settings.trans_sym
        );
        let maps = SymmetryMaps::build(&lattice, settings.trans_sym);

        info!("Building propagators (nflux = {}, dt = {})", settings.nflux, settings.dt);
        let hopping = Hopping::build(&lattice, &settings.hopping_model(), settings.dt);
        let on_site = OnSite::new(settings.u, settings.dt, &maps.site)?;
        let kernel = integral_kernel(settings.l)?;

        Ok(Self {
            lattice,
            maps,
            hopping,
            on_site,
            kernel,
        })
    }

    pub fn is_complex(&self) -> bool {
        self.hopping.is_complex()
    }
}
