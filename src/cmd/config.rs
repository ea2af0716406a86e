//! Configuration view and validation commands: `tracker-updater config`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracker_updater::config::{Config, ConfigFile, DEFAULT_CONFIG_FILE};

use super::super::{Cli, ConfigCommands};
use super::load_file;

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<ExitCode> {
    match command {
        None | Some(ConfigCommands::Show) => show(cli)?,
        Some(ConfigCommands::Validate) => validate(cli)?,
        Some(ConfigCommands::Init) => init(cli)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn show(cli: &Cli) -> Result<()> {
    let (file, path) = load_file(cli)?;
    let config = Config::resolve(file, cli.overrides())?;

    println!();
    println!("tracker-updater configuration");
    println!("=============================");
    println!();
    match &path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none (environment and flags only)"),
    }
    println!();

    println!("[trackers]");
    println!("  rt          = {}", config.rt.describe());
    println!("  dev_tracker = {}", config.dev_tracker.describe());
    println!("  community   = {}", config.community.describe());
    println!();

    let settings = &config.settings;
    println!("[engine]");
    println!("  assignee = \"{}\"", settings.assignee);
    println!("  max_concurrency = {}", settings.max_concurrency);
    println!("  request_timeout_secs = {}", config.request_timeout.as_secs());
    println!(
        "  throttle = {}..={} x {}ms",
        settings.throttle.min_units,
        settings.throttle.max_units,
        settings.throttle.unit.as_millis()
    );
    println!("  interactive = {}", config.interactive);
    println!();
    Ok(())
}

fn validate(cli: &Cli) -> Result<()> {
    println!();
    println!("Validating configuration...");
    println!();

    let (file, _) = load_file(cli)?;
    let config = Config::resolve(file, cli.overrides())?;
    let warnings = config.warnings();

    if warnings.is_empty() {
        println!("Configuration is valid.");
    } else {
        println!("Configuration warnings:");
        for warning in warnings {
            println!("  - {}", warning);
        }
    }
    println!();
    Ok(())
}

fn init(cli: &Cli) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .context("Failed to get current directory")?
            .join(DEFAULT_CONFIG_FILE),
    };

    if path.exists() {
        println!("{} already exists at {}", DEFAULT_CONFIG_FILE, path.display());
        println!("Delete it first if you want to recreate it.");
        return Ok(());
    }

    ConfigFile::template().save(&path)?;

    println!("Created {}", path.display());
    println!();
    println!("You can now set:");
    println!("  - [rt] url, username, password");
    println!("  - [dev_tracker] and [community] credentials");
    println!("  - [engine] assignee, max_concurrency, throttle");
    println!();
    Ok(())
}
