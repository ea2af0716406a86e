use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracker_updater::config::{EndpointConfig, Overrides};
use tracker_updater::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "tracker-updater")]
#[command(
    version,
    about = "Reconcile RT tickets with the dev and community bug trackers"
)]
pub struct Cli {
    /// Log at debug level (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Path to the config file. Defaults to ./tracker-updater.toml when present.
    #[arg(long, global = true, env = "TRACKER_UPDATER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ask for confirmation before each pass
    #[arg(short, long, global = true)]
    pub interactive: bool,

    #[command(flatten)]
    pub trackers: TrackerArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
pub struct TrackerArgs {
    /// RT base URL
    #[arg(long, global = true, env = "RT_URL")]
    pub rt_url: Option<String>,
    #[arg(long, global = true, env = "RT_USERNAME")]
    pub rt_username: Option<String>,
    #[arg(long, global = true, env = "RT_PASSWORD", hide_env_values = true)]
    pub rt_password: Option<String>,

    /// Dev tracker REST base URL
    #[arg(long, global = true, env = "DEV_TRACKER_URL")]
    pub dev_url: Option<String>,
    #[arg(long, global = true, env = "DEV_TRACKER_USERNAME")]
    pub dev_username: Option<String>,
    #[arg(long, global = true, env = "DEV_TRACKER_PASSWORD", hide_env_values = true)]
    pub dev_password: Option<String>,

    /// Community tracker REST base URL
    #[arg(long, global = true, env = "COMMUNITY_URL")]
    pub community_url: Option<String>,
    #[arg(long, global = true, env = "COMMUNITY_USERNAME")]
    pub community_username: Option<String>,
    #[arg(long, global = true, env = "COMMUNITY_PASSWORD", hide_env_values = true)]
    pub community_password: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run all reconciliation passes (the default)
    Run,
    /// View, validate or create the configuration file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration with passwords redacted
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a starter tracker-updater.toml
    Init,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        let t = &self.trackers;
        Overrides {
            rt: EndpointConfig {
                url: t.rt_url.clone(),
                username: t.rt_username.clone(),
                password: t.rt_password.clone(),
            },
            dev_tracker: EndpointConfig {
                url: t.dev_url.clone(),
                username: t.dev_username.clone(),
                password: t.dev_password.clone(),
            },
            community: EndpointConfig {
                url: t.community_url.clone(),
                username: t.community_username.clone(),
                password: t.community_password.clone(),
            },
            interactive: self.interactive,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.log_format, cli.verbose);

    let result = match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => cmd::cmd_run(&cli).await,
        Commands::Config { command } => cmd::cmd_config(&cli, command),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            cmd::exit_code_for(&err)
        }
    }
}
