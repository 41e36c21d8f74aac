//! Configuration management for simulation file generation
//!
//! Parameters come from an optional YAML file and from `key=value`
//! arguments (which win). Missing values take the defaults below, and
//! [`Config::resolve`] checks the combination before anything is written.

mod args;
mod params;

pub use args::Args;
pub use params::{parse_assignment, ParamValue};

use color_eyre::eyre::{eyre, Result, WrapErr};
use hubbard::{HoppingModel, Lattice};
use serde::Deserialize;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Raw parameter set, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub filename: Option<String>,
    pub prefix: Option<String>,
    pub overwrite: Option<i64>,
    pub seed: Option<u64>,
    #[serde(rename = "Nx")]
    pub nx: Option<usize>,
    #[serde(rename = "Ny")]
    pub ny: Option<usize>,
    pub mu: Option<f64>,
    #[serde(alias = "t'")]
    pub tp: Option<f64>,
    #[serde(rename = "U")]
    pub u: Option<f64>,
    pub dt: Option<f64>,
    #[serde(rename = "L")]
    pub l: Option<usize>,
    pub nflux: Option<i64>,
    pub n_delay: Option<usize>,
    pub n_matmul: Option<usize>,
    pub n_sweep_warm: Option<usize>,
    pub n_sweep_meas: Option<usize>,
    pub period_eqlt: Option<usize>,
    pub period_uneqlt: Option<usize>,
    pub meas_bond_corr: Option<i64>,
    pub meas_3curr: Option<i64>,
    pub meas_3curr_limit: Option<i64>,
    pub meas_energy_corr: Option<i64>,
    pub meas_nematic_corr: Option<i64>,
    pub trans_sym: Option<i64>,
    #[serde(rename = "Nfiles")]
    pub nfiles: Option<usize>,
}

impl Config {
    /// Defaults of every parameter except `seed`, `prefix` and `filename`,
    /// which depend on the run.
    pub fn defaults() -> Self {
        Config {
            filename: None,
            prefix: None,
            overwrite: Some(0),
            seed: None,
            nx: Some(16),
            ny: Some(4),
            mu: Some(0.0),
            tp: Some(0.0),
            u: Some(6.0),
            dt: Some(0.115),
            l: Some(40),
            nflux: Some(0),
            n_delay: Some(16),
            n_matmul: Some(8),
            n_sweep_warm: Some(200),
            n_sweep_meas: Some(2000),
            period_eqlt: Some(8),
            period_uneqlt: Some(0),
            meas_bond_corr: Some(0),
            meas_3curr: Some(0),
            meas_3curr_limit: Some(0),
            meas_energy_corr: Some(0),
            meas_nematic_corr: Some(0),
            trans_sym: Some(1),
            nfiles: Some(1),
        }
    }

    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Unable to read configuration file: {}", path))?;
        serde_yml::from_str::<Config>(&content).wrap_err("Failed to parse configuration file")
    }

    /// Apply one `key=value` parameter.
    pub fn set(&mut self, key: &str, value: &ParamValue) -> Result<()> {
        match key {
            "filename" => self.filename = Some(value.as_text()),
            "prefix" => self.prefix = Some(value.as_text()),
            "overwrite" => self.overwrite = Some(value.as_int(key)?),
            "seed" => self.seed = Some(value.as_u64(key)?),
            "Nx" => self.nx = Some(value.as_count(key)?),
            "Ny" => self.ny = Some(value.as_count(key)?),
            "mu" => self.mu = Some(value.as_float(key)?),
            "tp" | "t'" => self.tp = Some(value.as_float(key)?),
            "U" => self.u = Some(value.as_float(key)?),
            "dt" => self.dt = Some(value.as_float(key)?),
            "L" => self.l = Some(value.as_count(key)?),
            "nflux" => self.nflux = Some(value.as_int(key)?),
            "n_delay" => self.n_delay = Some(value.as_count(key)?),
            "n_matmul" => self.n_matmul = Some(value.as_count(key)?),
            "n_sweep_warm" => self.n_sweep_warm = Some(value.as_count(key)?),
            "n_sweep_meas" => self.n_sweep_meas = Some(value.as_count(key)?),
            "period_eqlt" => self.period_eqlt = Some(value.as_count(key)?),
            "period_uneqlt" => self.period_uneqlt = Some(value.as_count(key)?),
            "meas_bond_corr" => self.meas_bond_corr = Some(value.as_int(key)?),
            "meas_3curr" => self.meas_3curr = Some(value.as_int(key)?),
            "meas_3curr_limit" => self.meas_3curr_limit = Some(value.as_int(key)?),
            "meas_energy_corr" => self.meas_energy_corr = Some(value.as_int(key)?),
            "meas_nematic_corr" => self.meas_nematic_corr = Some(value.as_int(key)?),
            "trans_sym" => self.trans_sym = Some(value.as_int(key)?),
            "Nfiles" => self.nfiles = Some(value.as_count(key)?),
            _ => return Err(eyre!("unrecognized parameter: {}", key)),
        }
        Ok(())
    }

    /// Apply default values to any missing parameters
    pub fn with_defaults(self) -> Self {
        let d = Self::defaults();
        Config {
            filename: self.filename,
            prefix: self.prefix,
            overwrite: self.overwrite.or(d.overwrite),
            seed: self.seed,
            nx: self.nx.or(d.nx),
            ny: self.ny.or(d.ny),
            mu: self.mu.or(d.mu),
            tp: self.tp.or(d.tp),
            u: self.u.or(d.u),
            dt: self.dt.or(d.dt),
            l: self.l.or(d.l),
            nflux: self.nflux.or(d.nflux),
            n_delay: self.n_delay.or(d.n_delay),
            n_matmul: self.n_matmul.or(d.n_matmul),
            n_sweep_warm: self.n_sweep_warm.or(d.n_sweep_warm),
            n_sweep_meas: self.n_sweep_meas.or(d.n_sweep_meas),
            period_eqlt: self.period_eqlt.or(d.period_eqlt),
            period_uneqlt: self.period_uneqlt.or(d.period_uneqlt),
            meas_bond_corr: self.meas_bond_corr.or(d.meas_bond_corr),
            meas_3curr: self.meas_3curr.or(d.meas_3curr),
            meas_3curr_limit: self.meas_3curr_limit.or(d.meas_3curr_limit),
            meas_energy_corr: self.meas_energy_corr.or(d.meas_energy_corr),
            meas_nematic_corr: self.meas_nematic_corr.or(d.meas_nematic_corr),
            trans_sym: self.trans_sym.or(d.trans_sym),
            nfiles: self.nfiles.or(d.nfiles),
        }
    }

    /// Fill defaults, pick the run-dependent values and validate.
    pub fn resolve(self) -> Result<Settings> {
        let c = self.with_defaults();
        let seed = c.seed.unwrap_or_else(wall_clock_seed);
        let settings = Settings {
            nx: c.nx.unwrap_or_default(),
            ny: c.ny.unwrap_or_default(),
            mu: c.mu.unwrap_or_default(),
            tp: c.tp.unwrap_or_default(),
            u: c.u.unwrap_or_default(),
            dt: c.dt.unwrap_or_default(),
            l: c.l.unwrap_or_default(),
            nflux: c.nflux.unwrap_or_default(),
            trans_sym: c.trans_sym.unwrap_or_default() != 0,
            seed,
            sweeps: SweepControl {
                n_delay: c.n_delay.unwrap_or_default(),
                n_matmul: c.n_matmul.unwrap_or_default(),
                n_sweep_warm: c.n_sweep_warm.unwrap_or_default(),
                n_sweep_meas: c.n_sweep_meas.unwrap_or_default(),
                period_eqlt: c.period_eqlt.unwrap_or_default(),
                period_uneqlt: c.period_uneqlt.unwrap_or_default(),
            },
            meas: Measurements {
                bond_corr: c.meas_bond_corr.unwrap_or_default() != 0,
                three_curr: c.meas_3curr.unwrap_or_default() != 0,
                three_curr_limit: c.meas_3curr_limit.unwrap_or_default() != 0,
                energy_corr: c.meas_energy_corr.unwrap_or_default() != 0,
                nematic_corr: c.meas_nematic_corr.unwrap_or_default() != 0,
            },
            prefix: c.prefix.unwrap_or_else(|| seed.to_string()),
            filename: c.filename,
            nfiles: c.nfiles.unwrap_or_default(),
            overwrite: c.overwrite.unwrap_or_default() != 0,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Monte Carlo control knobs, passed through to the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepControl {
    pub n_delay: usize,
    pub n_matmul: usize,
    pub n_sweep_warm: usize,
    pub n_sweep_meas: usize,
    pub period_eqlt: usize,
    pub period_uneqlt: usize,
}

/// Optional measurement groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Measurements {
    pub bond_corr: bool,
    pub three_curr: bool,
    pub three_curr_limit: bool,
    pub energy_corr: bool,
    pub nematic_corr: bool,
}

/// Fully resolved, validated parameters of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub nx: usize,
    pub ny: usize,
    pub mu: f64,
    pub tp: f64,
    pub u: f64,
    pub dt: f64,
    pub l: usize,
    pub nflux: i64,
    pub trans_sym: bool,
    pub seed: u64,
    pub sweeps: SweepControl,
    pub meas: Measurements,
    pub prefix: String,
    pub filename: Option<String>,
    pub nfiles: usize,
    pub overwrite: bool,
}

impl Settings {
    pub fn lattice(&self) -> Lattice {
        Lattice::new(self.nx, self.ny, self.tp != 0.0)
    }

    pub fn hopping_model(&self) -> HoppingModel {
        HoppingModel {
            tp: self.tp,
            mu: self.mu,
            nflux: self.nflux,
        }
    }

    pub fn n(&self) -> usize {
        self.nx * self.ny
    }

    /// Every integer written to a simulation file is stored as 32 bits.
    fn check_int_ranges(&self) -> Result<()> {
        let sweeps = &self.sweeps;
        let n = self.nx.checked_mul(self.ny);
        let bps: usize = if self.tp != 0.0 { 4 } else { 2 };
        let num_bbb = n
            .and_then(|n| n.checked_mul(n))
            .and_then(|n2| n2.checked_mul(bps * bps * bps));
        let counts = [
            ("Nx", Some(self.nx)),
            ("Ny", Some(self.ny)),
            ("N", n),
            ("num_bbb", num_bbb),
            ("L", Some(self.l)),
            ("n_delay", Some(sweeps.n_delay)),
            ("n_matmul", Some(sweeps.n_matmul)),
            ("n_sweep", sweeps.n_sweep_warm.checked_add(sweeps.n_sweep_meas)),
            ("period_eqlt", Some(sweeps.period_eqlt)),
            ("period_uneqlt", Some(sweeps.period_uneqlt)),
        ];
        for (name, count) in counts {
            if count.and_then(|c| i32::try_from(c).ok()).is_none() {
                return Err(eyre!("{} is too large for a simulation file", name));
            }
        }
        if i32::try_from(self.nflux).is_err() {
            return Err(eyre!("nflux = {} is out of range", self.nflux));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 {
            return Err(eyre!("Nx and Ny must be positive, got {}x{}", self.nx, self.ny));
        }
        for (name, x) in [("mu", self.mu), ("t'", self.tp), ("U", self.u), ("dt", self.dt)] {
            if !x.is_finite() {
                return Err(eyre!("{} must be finite, got {}", name, x));
            }
        }
        self.check_int_ranges()?;
        if self.l == 0 {
            return Err(eyre!("L must be positive"));
        }
        if self.dt <= 0.0 {
            return Err(eyre!("dt must be positive, got {}", self.dt));
        }
        if self.u < 0.0 {
            return Err(eyre!("U must be non-negative, got {}", self.u));
        }
        if self.sweeps.n_matmul == 0 || self.l % self.sweeps.n_matmul != 0 {
            return Err(eyre!(
                "L = {} must be divisible by n_matmul = {}",
                self.l,
                self.sweeps.n_matmul
            ));
        }
        if self.sweeps.period_eqlt == 0 || self.l % self.sweeps.period_eqlt != 0 {
            return Err(eyre!(
                "L = {} must be divisible by period_eqlt = {}",
                self.l,
                self.sweeps.period_eqlt
            ));
        }
        if self.meas.three_curr_limit && self.tp != 0.0 {
            return Err(eyre!(
                "meas_3curr_limit is only defined without diagonal hopping (t' = {})",
                self.tp
            ));
        }
        if self.nfiles == 0 {
            return Err(eyre!("Nfiles must be at least 1"));
        }
        if self.filename.is_some() && self.nfiles > 1 {
            return Err(eyre!("filename can only be used with Nfiles = 1; use prefix"));
        }
        Ok(())
    }
}
