//! Configuration for tracker-updater.
//!
//! Settings are layered: `tracker-updater.toml` → environment → CLI flags.
//! The environment and CLI layers both arrive through clap (every flag has an
//! `env` fallback), so this module only merges a [`ConfigFile`] with
//! [`Overrides`].
//!
//! # Configuration File Format
//!
//! ```toml
//! [rt]
//! url = "https://rt.example.org/"
//! username = "bot"
//! password = "secret"
//!
//! [dev_tracker]
//! url = "http://tracker.devs.bywatersolutions.com/rest/"
//!
//! [community]
//! url = "https://bugs.koha-community.org/bugzilla3/rest/"
//!
//! [engine]
//! assignee = "jesse@bywatersolutions.com"
//! max_concurrency = 8
//! request_timeout_secs = 30
//! throttle_unit_ms = 100
//! throttle_min_units = 1
//! throttle_max_units = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::mapper::DEFAULT_ASSIGNEE;
use crate::reconcile::{ReconcileSettings, Throttle};

pub const DEFAULT_CONFIG_FILE: &str = "tracker-updater.toml";
pub const DEFAULT_DEV_TRACKER_URL: &str = "http://tracker.devs.bywatersolutions.com/rest/";
pub const DEFAULT_COMMUNITY_URL: &str = "https://bugs.koha-community.org/bugzilla3/rest/";

/// Endpoint and credentials for one tracker, as written in the file or on the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl EndpointConfig {
    /// Values set here win over `base`.
    fn layered_over(self, base: EndpointConfig) -> EndpointConfig {
        EndpointConfig {
            url: self.url.or(base.url),
            username: self.username.or(base.username),
            password: self.password.or(base.password),
        }
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Assignee for newly created dev tracker bugs
    #[serde(default = "default_assignee")]
    pub assignee: String,
    /// Upper bound on concurrently processed records per pass
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Timeout applied to every tracker request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Length of one throttle unit before each RT ticket fetch
    #[serde(default = "default_throttle_unit_ms")]
    pub throttle_unit_ms: u64,
    #[serde(default = "default_throttle_min_units")]
    pub throttle_min_units: u32,
    #[serde(default = "default_throttle_max_units")]
    pub throttle_max_units: u32,
}

fn default_assignee() -> String {
    DEFAULT_ASSIGNEE.to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_throttle_unit_ms() -> u64 {
    100
}

fn default_throttle_min_units() -> u32 {
    1
}

fn default_throttle_max_units() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            assignee: default_assignee(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            throttle_unit_ms: default_throttle_unit_ms(),
            throttle_min_units: default_throttle_min_units(),
            throttle_max_units: default_throttle_max_units(),
        }
    }
}

/// Contents of `tracker-updater.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub rt: EndpointConfig,
    #[serde(default)]
    pub dev_tracker: EndpointConfig,
    #[serde(default)]
    pub community: EndpointConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given, else the default file in `dir` if it exists,
    /// else an empty configuration.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let default_path = dir.join(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Ok((Self::load(&default_path)?, Some(default_path)));
        }
        Ok((Self::default(), None))
    }

    /// Starter file written by `config init`.
    pub fn template() -> Self {
        Self {
            rt: EndpointConfig {
                url: Some("https://rt.example.org/".to_string()),
                username: Some("tracker-updater".to_string()),
                password: None,
            },
            dev_tracker: EndpointConfig {
                url: Some(DEFAULT_DEV_TRACKER_URL.to_string()),
                ..Default::default()
            },
            community: EndpointConfig {
                url: Some(DEFAULT_COMMUNITY_URL.to_string()),
                ..Default::default()
            },
            engine: EngineConfig::default(),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file at {}", path.display()))
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rt: EndpointConfig,
    pub dev_tracker: EndpointConfig,
    pub community: EndpointConfig,
    pub interactive: bool,
}

/// A resolved tracker endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Endpoint {
    fn resolve(name: &'static str, layered: EndpointConfig, default_url: Option<&str>) -> Result<Self, ConfigError> {
        let url = layered
            .url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| default_url.map(str::to_string))
            .ok_or(ConfigError::MissingUrl(name))?;
        reqwest::Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
            name,
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            url,
            username: layered.username,
            password: layered.password,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Human-readable form with the password masked.
    pub fn describe(&self) -> String {
        let user = self.username.as_deref().unwrap_or("<anonymous>");
        let password = if self.password.is_some() { "********" } else { "<none>" };
        format!("{} (user: {}, password: {})", self.url, user, password)
    }
}

/// Effective runtime configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub rt: Endpoint,
    pub dev_tracker: Endpoint,
    pub community: Endpoint,
    pub interactive: bool,
    pub request_timeout: Duration,
    pub settings: ReconcileSettings,
}

impl Config {
    pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Self, ConfigError> {
        let engine = file.engine;
        if engine.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if engine.throttle_min_units > engine.throttle_max_units {
            return Err(ConfigError::InvalidThrottle {
                min: engine.throttle_min_units,
                max: engine.throttle_max_units,
            });
        }

        Ok(Self {
            rt: Endpoint::resolve("RT", overrides.rt.layered_over(file.rt), None)?,
            dev_tracker: Endpoint::resolve(
                "dev tracker",
                overrides.dev_tracker.layered_over(file.dev_tracker),
                Some(DEFAULT_DEV_TRACKER_URL),
            )?,
            community: Endpoint::resolve(
                "community tracker",
                overrides.community.layered_over(file.community),
                Some(DEFAULT_COMMUNITY_URL),
            )?,
            interactive: overrides.interactive,
            request_timeout: Duration::from_secs(engine.request_timeout_secs),
            settings: ReconcileSettings {
                assignee: engine.assignee,
                max_concurrency: engine.max_concurrency,
                throttle: Throttle {
                    unit: Duration::from_millis(engine.throttle_unit_ms),
                    min_units: engine.throttle_min_units,
                    max_units: engine.throttle_max_units,
                },
            },
        })
    }

    /// Non-fatal issues worth showing before a run.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (name, endpoint) in [
            ("RT", &self.rt),
            ("dev tracker", &self.dev_tracker),
            ("community tracker", &self.community),
        ] {
            if !endpoint.has_credentials() {
                warnings.push(format!(
                    "{} credentials are incomplete; requests will be anonymous",
                    name
                ));
            }
        }
        if self.request_timeout.is_zero() {
            warnings.push("request_timeout_secs is 0; every request will time out".to_string());
        }
        warnings
    }
}
