//! Layout of one simulation file
//!
//! Groups written:
//! * `metadata`: physical parameters, for analysis only
//! * `params`: everything the simulation reads once at startup
//! * `state`: sweep counter, generator state and auxiliary field
//! * `meas_eqlt`, `meas_uneqlt`: zeroed measurement accumulators

use super::artifacts::Artifacts;
use crate::config::Settings;
use crate::io::{Container, Dataset, Group};
use color_eyre::eyre::Result;
use hubbard::{ClassMap, Hopping, HsField, Observable, RngState, SpinPropagators};
use nalgebra::{ComplexField, DMatrix};
use num_complex::Complex64;

/// Format version written to `metadata/version`.
pub const FORMAT_VERSION: f64 = 0.0;

/// Generator state and initial field of one ensemble member.
#[derive(Debug, Clone, PartialEq)]
pub struct Replica {
    /// State after drawing `hs`, where the simulation resumes the stream.
    pub rng: RngState,
    pub hs: HsField,
}

impl Replica {
    /// Draw an `L × N` field from a copy of `base`.
    pub fn draw(base: &RngState, slices: usize, sites: usize) -> Self {
        let mut rng = *base;
        let hs = HsField::draw(&mut rng, slices, sites);
        Self { rng, hs }
    }

    /// Overwrite the replica-dependent datasets of an assembled file.
    pub fn apply(&self, container: &mut Container) -> Result<()> {
        let words = Dataset::words(&self.rng.to_words());
        container.replace("params", "init_rng", words.clone())?;
        container.replace("state", "rng", words)?;
        container.replace("state", "hs", hs_dataset(&self.hs))?;
        Ok(())
    }
}

fn hs_dataset(hs: &HsField) -> Dataset {
    Dataset::ints(hs.shape().to_vec(), hs.values.clone())
}

fn map_dataset(map: &ClassMap) -> Dataset {
    Dataset::ints(map.shape.clone(), map.map.clone())
}

fn degen_dataset(map: &ClassMap) -> Dataset {
    Dataset::ints(vec![map.num_classes()], map.degeneracy.clone())
}

/// Conversion of a propagator matrix into a row-major dataset.
trait MatrixDataset {
    fn dataset(&self) -> Dataset;
}

impl MatrixDataset for DMatrix<f64> {
    fn dataset(&self) -> Dataset {
        Dataset::real_matrix(self)
    }
}

impl MatrixDataset for DMatrix<Complex64> {
    fn dataset(&self) -> Dataset {
        Dataset::complex_matrix(self)
    }
}

fn insert_hopping<T>(params: &mut Group, p: &SpinPropagators<T>)
where
    T: ComplexField,
    DMatrix<T>: MatrixDataset,
{
    let mut put = |name: &str, m: &DMatrix<T>| {
        params.insert(name.to_string(), m.dataset());
    };
    put("peierlsu", &p.peierls);
    put("peierlsd", &p.peierls);
    for (suffix, s) in [("u", &p.up), ("d", &p.down)] {
        put(&format!("K{}", suffix), &s.k);
        put(&format!("exp_K{}", suffix), &s.exp_k);
        put(&format!("inv_exp_K{}", suffix), &s.inv_exp_k);
        put(&format!("exp_halfK{}", suffix), &s.exp_half_k);
        put(&format!("inv_exp_halfK{}", suffix), &s.inv_exp_half_k);
    }
}

/// Zeroed accumulator, complex when the propagators are.
fn accumulator(complex: bool, shape: Vec<usize>) -> Dataset {
    let len = shape.iter().product();
    if complex {
        Dataset::complexes(shape, &vec![Complex64::new(0.0, 0.0); len])
    } else {
        Dataset::floats(shape, vec![0.0; len])
    }
}

fn metadata(settings: &Settings, artifacts: &Artifacts) -> Group {
    let model = if artifacts.is_complex() {
        "Hubbard (complex)"
    } else {
        "Hubbard"
    };
    Group::from([
        ("version".to_string(), Dataset::float(FORMAT_VERSION)),
        ("model".to_string(), Dataset::text(model)),
        ("Nx".to_string(), Dataset::int(settings.nx as i64)),
        ("Ny".to_string(), Dataset::int(settings.ny as i64)),
        ("bps".to_string(), Dataset::int(artifacts.lattice.bps() as i64)),
        ("U".to_string(), Dataset::float(settings.u)),
        ("t'".to_string(), Dataset::float(settings.tp)),
        ("nflux".to_string(), Dataset::int(settings.nflux)),
        ("mu".to_string(), Dataset::float(settings.mu)),
        ("beta".to_string(), Dataset::float(settings.l as f64 * settings.dt)),
    ])
}

fn params(settings: &Settings, artifacts: &Artifacts, replica: &Replica) -> Group {
    let lattice = &artifacts.lattice;
    let maps = &artifacts.maps;
    let sweeps = &settings.sweeps;
    let meas = &settings.meas;
    let mut p = Group::new();
    let mut put = |name: &str, ds: Dataset| {
        p.insert(name.to_string(), ds);
    };

    put("N", Dataset::int(lattice.n() as i64));
    put("L", Dataset::int(settings.l as i64));

    let bonds = lattice.bonds();
    let ends = (0..2)
        .flat_map(|r| bonds.iter().map(move |b| b[r] as i32))
        .collect();
    put("bonds", Dataset::ints(vec![2, bonds.len()], ends));
    put("num_b", Dataset::int(lattice.num_bonds() as i64));

    for obs in Observable::ALL {
        let name = obs.name();
        put(&format!("num_{}", name), Dataset::int(maps.num_classes(obs) as i64));
        if let Some(map) = maps.get(obs) {
            put(&format!("map_{}", name), map_dataset(map));
            put(&format!("degen_{}", name), degen_dataset(map));
        }
    }

    put("integral_kernel", Dataset::real_matrix(&artifacts.kernel));

    let on_site = &artifacts.on_site;
    put("U", Dataset::floats(vec![on_site.u.len()], on_site.u.clone()));
    put("dt", Dataset::float(settings.dt));
    put("exp_lambda", Dataset::real_matrix(&on_site.exp_lambda));
    put("del", Dataset::real_matrix(&on_site.del));

    put("n_matmul", Dataset::int(sweeps.n_matmul as i64));
    put("n_delay", Dataset::int(sweeps.n_delay as i64));
    put("n_sweep_warm", Dataset::int(sweeps.n_sweep_warm as i64));
    put("n_sweep_meas", Dataset::int(sweeps.n_sweep_meas as i64));
    put("period_eqlt", Dataset::int(sweeps.period_eqlt as i64));
    put("period_uneqlt", Dataset::int(sweeps.period_uneqlt as i64));
    put("F", Dataset::int((settings.l / sweeps.n_matmul) as i64));
    put(
        "n_sweep",
        Dataset::int((sweeps.n_sweep_warm + sweeps.n_sweep_meas) as i64),
    );

    put("meas_bond_corr", Dataset::flag(meas.bond_corr));
    put("meas_3curr", Dataset::flag(meas.three_curr));
    put("meas_3curr_limit", Dataset::flag(meas.three_curr_limit));
    put("meas_energy_corr", Dataset::flag(meas.energy_corr));
    put("meas_nematic_corr", Dataset::flag(meas.nematic_corr));

    put("init_rng", Dataset::words(&replica.rng.to_words()));

    match &artifacts.hopping {
        Hopping::Real(prop) => insert_hopping(&mut p, prop),
        Hopping::Complex(prop) => insert_hopping(&mut p, prop),
    }
    p
}

fn state(replica: &Replica) -> Group {
    Group::from([
        ("sweep".to_string(), Dataset::int(0)),
        ("rng".to_string(), Dataset::words(&replica.rng.to_words())),
        ("hs".to_string(), hs_dataset(&replica.hs)),
    ])
}

fn meas_eqlt(settings: &Settings, artifacts: &Artifacts) -> Group {
    let complex = artifacts.is_complex();
    let maps = &artifacts.maps;
    let num_i = maps.num_classes(Observable::Site);
    let num_ij = maps.num_classes(Observable::SitePair);
    let num_bs = maps.num_classes(Observable::BondSite);
    let num_bb = maps.num_classes(Observable::BondPair);

    let mut g = Group::new();
    let mut zeros = |name: &str, len: usize| {
        g.insert(name.to_string(), accumulator(complex, vec![len]));
    };
    zeros("density", num_i);
    zeros("double_occ", num_i);
    for name in ["g00", "nn", "xx", "zz", "pair_sw"] {
        zeros(name, num_ij);
    }
    if settings.meas.energy_corr {
        zeros("kk", num_bb);
        zeros("kv", num_bs);
        zeros("kn", num_bs);
        zeros("vv", num_ij);
        zeros("vn", num_ij);
    }
    g.insert("n_sample".to_string(), Dataset::int(0));
    g.insert("sign".to_string(), accumulator(complex, vec![]));
    g
}

fn meas_uneqlt(settings: &Settings, artifacts: &Artifacts) -> Group {
    let complex = artifacts.is_complex();
    let maps = &artifacts.maps;
    let l = settings.l;
    let num_ij = maps.num_classes(Observable::SitePair);
    let num_bs = maps.num_classes(Observable::BondSite);
    let num_bb = maps.num_classes(Observable::BondPair);
    let num_bbb = maps.num_classes(Observable::BondTriple);
    let num_bbb_lim = maps.num_classes(Observable::BondTripleRestricted);
    let meas = &settings.meas;

    let mut g = Group::new();
    let mut zeros = |name: &str, len: usize| {
        g.insert(name.to_string(), accumulator(complex, vec![len * l]));
    };
    for name in ["gt0", "nn", "xx", "zz", "pair_sw"] {
        zeros(name, num_ij);
    }
    if meas.bond_corr {
        for name in ["pair_bb", "jj", "jsjs", "kk", "ksks"] {
            zeros(name, num_bb);
        }
    }
    if meas.energy_corr {
        zeros("kv", num_bs);
        zeros("kn", num_bs);
        zeros("vv", num_ij);
        zeros("vn", num_ij);
    }
    if meas.nematic_corr {
        zeros("nem_nnnn", num_bb);
        zeros("nem_ssss", num_bb);
    }
    // current-current-current correlators are real even with flux
    if meas.three_curr {
        g.insert("jjj".to_string(), accumulator(false, vec![num_bbb * l]));
    }
    if meas.three_curr_limit {
        g.insert("jjj_l".to_string(), accumulator(false, vec![num_bbb_lim * l]));
    }
    g.insert("n_sample".to_string(), Dataset::int(0));
    g.insert("sign".to_string(), accumulator(complex, vec![]));
    g
}

/// Assemble the full file of one replica.
pub fn assemble(settings: &Settings, artifacts: &Artifacts, replica: &Replica) -> Container {
    let mut container = Container::new();
    container
        .groups
        .insert("metadata".to_string(), metadata(settings, artifacts));
    container
        .groups
        .insert("params".to_string(), params(settings, artifacts, replica));
    container.groups.insert("state".to_string(), state(replica));
    container
        .groups
        .insert("meas_eqlt".to_string(), meas_eqlt(settings, artifacts));
    if settings.sweeps.period_uneqlt > 0 {
        container
            .groups
            .insert("meas_uneqlt".to_string(), meas_uneqlt(settings, artifacts));
    }
    container
}
