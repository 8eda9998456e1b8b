//! Configuration loading and resolution
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A config file missing from the default location is not an error; the compiled
//! defaults apply. A missing file named explicitly (flag or `BSYNC_CONFIG`) is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit config file
pub const ENV_CONFIG: &str = "BSYNC_CONFIG";
pub const ENV_HOST: &str = "BSYNC_HOST";
pub const ENV_PORT: &str = "BSYNC_PORT";
pub const ENV_CONTROL_POLICY: &str = "BSYNC_CONTROL_POLICY";

/// Which participants may mutate a room's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPolicy {
    /// Every participant may reorder, add and delete
    Everyone,
    /// Only the room admin may mutate
    AdminOnly,
}

impl FromStr for ControlPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "everyone" => Ok(ControlPolicy::Everyone),
            "admin_only" | "admin" => Ok(ControlPolicy::AdminOnly),
            other => Err(Error::Config(format!("unknown control policy '{}'", other))),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8700,
        }
    }
}

/// `[rooms]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub control_policy: ControlPolicy,
    /// Per-connection outbound message buffer
    pub outbound_buffer: usize,
    /// Per-room command channel capacity
    pub command_buffer: usize,
    /// Seconds an empty room survives before it is dropped
    pub idle_timeout_secs: u64,
}

impl RoomsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            control_policy: ControlPolicy::AdminOnly,
            outbound_buffer: 64,
            command_buffer: 32,
            idle_timeout_secs: 300,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Full configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub rooms: RoomsConfig,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.rooms.outbound_buffer < 2 {
            return Err(Error::Config("rooms.outbound_buffer must be at least 2".to_string()));
        }
        if self.rooms.command_buffer == 0 {
            return Err(Error::Config("rooms.command_buffer must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub control_policy: Option<ControlPolicy>,
}

/// Resolves the effective configuration from CLI, environment, file and defaults
pub struct ConfigResolver {
    module_name: String,
}

impl ConfigResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
        }
    }

    pub fn resolve(&self, cli: &CliOverrides) -> Result<TomlConfig> {
        let mut config = match self.config_file(cli)? {
            Some(path) => {
                info!("{}: loading config from {}", self.module_name, path.display());
                TomlConfig::load(&path)?
            }
            None => {
                debug!("{}: no config file found, using compiled defaults", self.module_name);
                TomlConfig::default()
            }
        };

        // Priority 2: environment
        if let Some(host) = env_var(ENV_HOST) {
            config.server.host = host;
        }
        if let Some(port) = env_var(ENV_PORT) {
            config.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: '{}'", ENV_PORT, port)))?;
        }
        if let Some(policy) = env_var(ENV_CONTROL_POLICY) {
            config.rooms.control_policy = policy.parse()?;
        }

        // Priority 1: command line
        if let Some(host) = &cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(policy) = cli.control_policy {
            config.rooms.control_policy = policy;
        }

        config.validate()?;
        Ok(config)
    }

    /// Explicit path (CLI, then env) must exist; the platform default may be absent
    fn config_file(&self, cli: &CliOverrides) -> Result<Option<PathBuf>> {
        let explicit = cli
            .config_path
            .clone()
            .or_else(|| env_var(ENV_CONFIG).map(PathBuf::from));

        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::Config(format!("Config file not found: {}", path.display())));
        }

        match default_config_path() {
            Some(path) if path.exists() => Ok(Some(path)),
            Some(path) => {
                debug!("Default config file {} absent", path.display());
                Ok(None)
            }
            None => {
                warn!("Could not determine config directory for this platform");
                Ok(None)
            }
        }
    }
}

/// `<config_dir>/bsync/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bsync").join("config.toml"))
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
