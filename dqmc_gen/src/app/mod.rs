mod artifacts;
mod assemble;
mod batch;
mod report;

pub use artifacts::Artifacts;
pub use assemble::{assemble, Replica, FORMAT_VERSION};
pub use batch::{create_batch, file_names};

use self::report::{report_artifacts, report_batch, report_settings};
use crate::config::{parse_assignment, Args, Config, Settings};
use crate::io::setup_output;
use clap::Parser;
use color_eyre::eyre::Result;
use std::path::PathBuf;
use tracing::info;

pub struct DqmcApplication {
    args: Args,
    settings: Settings,
}

impl DqmcApplication {
    pub fn from_cli() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let settings = load_settings(&args)?;
        Ok(Self { args, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(self) -> Result<Vec<PathBuf>> {
        setup_output(self.args.output.as_ref());
        report_settings(&self.settings);

        let artifacts = Artifacts::build(&self.settings)?;
        report_artifacts(&artifacts);

        let paths = create_batch(&self.settings, &artifacts)?;
        report_batch(&paths);
        Ok(paths)
    }
}

/// YAML file first, then `key=value` arguments, then the `--overwrite` flag.
fn load_settings(args: &Args) -> Result<Settings> {
    let mut config = match &args.config_file {
        Some(path) => {
            info!("Reading configuration from: {}", path);
            Config::from_yaml_file(path)?
        }
        None => Config::default(),
    };

    for param in &args.params {
        let (key, value) = parse_assignment(param)?;
        config.set(&key, &value)?;
    }
    if args.overwrite {
        config.overwrite = Some(1);
    }

    config.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(params: &[&str]) -> Args {
        Args {
            params: params.iter().map(|s| s.to_string()).collect(),
            ..Args::default()
        }
    }

    #[test]
    fn test_later_assignment_wins() {
        let app = DqmcApplication::from_args(args(&["Nx=4", "Nx=6", "seed=1"])).unwrap();
        assert_eq!(app.settings().nx, 6);
    }

    #[test]
    fn test_overwrite_flag() {
        let mut a = args(&["seed=1"]);
        a.overwrite = true;
        assert!(DqmcApplication::from_args(a).unwrap().settings().overwrite);
    }

    #[test]
    fn test_bad_arguments_are_fatal() {
        assert!(DqmcApplication::from_args(args(&["Nx"])).is_err());
        assert!(DqmcApplication::from_args(args(&["nx=4"])).is_err());
        assert!(DqmcApplication::from_args(args(&["L=12"])).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let a = Args {
            config_file: Some("/nonexistent/dqmc.yaml".to_string()),
            ..Args::default()
        };
        assert!(DqmcApplication::from_args(a).is_err());
    }
}
