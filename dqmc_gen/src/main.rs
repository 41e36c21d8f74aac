//! DQMC input generator command-line interface
//!
//! Usage: `dqmc-gen [--config-file FILE] [--overwrite] KEY=VALUE ...`

use color_eyre::eyre::Result;
use dqmc_gen::app::DqmcApplication;

fn main() -> Result<()> {
    color_eyre::install()?;
    DqmcApplication::from_cli()?.run()?;
    Ok(())
}
