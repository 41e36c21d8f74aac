//! Command-line argument parsing for simulation file generation

use clap::Parser;

/// Generate input files for a DQMC simulation of the Hubbard model
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Optional YAML file with parameters (overridden by KEY=VALUE)
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Override log file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Replace existing simulation files
    #[arg(long)]
    pub overwrite: bool,

    /// Parameters as KEY=VALUE, e.g. Nx=8 U=4 "t'=-0.25"
    #[arg(value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}
