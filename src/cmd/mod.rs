//! CLI command implementations.
//!
//! | Module   | Commands handled |
//! |----------|------------------|
//! | `run`    | `Run`            |
//! | `config` | `Config`         |

pub mod config;
pub mod run;

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracker_updater::config::{Config, ConfigFile};
use tracker_updater::errors::ConfigError;

use super::Cli;

pub use config::cmd_config;
pub use run::cmd_run;

/// A fatal reconciliation error stopped the run.
pub const EXIT_FATAL: u8 = 1;
/// The configuration or command line is unusable.
pub const EXIT_CONFIG: u8 = 2;

pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<ConfigError>().is_some() {
        ExitCode::from(EXIT_CONFIG)
    } else {
        ExitCode::from(EXIT_FATAL)
    }
}

/// Locate and parse the config file, returning it with the path it came from.
pub fn load_file(cli: &Cli) -> Result<(ConfigFile, Option<std::path::PathBuf>)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(ConfigFile::discover(cli.config.as_deref(), &cwd)?)
}

/// Effective configuration: file, then environment and flags.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let (file, _) = load_file(cli)?;
    Ok(Config::resolve(file, cli.overrides())?)
}
