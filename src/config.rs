//! Layered configuration for the taskboard service.
//!
//! Values are resolved in this order, later layers winning:
//! built-in defaults → `taskboard.toml` → environment (`TASKBOARD_*`, with
//! `.env` loaded by the binary) → command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! cors_permissive = false
//!
//! [database]
//! path = "taskboard.db"
//!
//! [logging]
//! level = "info"
//! format = "pretty"   # or "json"
//! dir = "logs"        # optional daily-rolling file output
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::board::server::ServerConfig;
use crate::logging::LogFormat;

pub const DEFAULT_CONFIG_FILE: &str = "taskboard.toml";

pub const ENV_HOST: &str = "TASKBOARD_HOST";
pub const ENV_PORT: &str = "TASKBOARD_PORT";
pub const ENV_DB_PATH: &str = "TASKBOARD_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKBOARD_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "TASKBOARD_LOG_FORMAT";
pub const ENV_LOG_DIR: &str = "TASKBOARD_LOG_DIR";

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow any origin (for a front-end dev server on another port)
    #[serde(default)]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("taskboard.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directive string, e.g. "info" or "taskboard=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Directory for daily-rolling log files; stderr only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            dir: None,
        }
    }
}

/// Parsed `taskboard.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskboardToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Flag values from the command line. `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub dev: bool,
    pub verbose: bool,
}

impl TaskboardToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard.toml")
    }

    /// Load from `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize taskboard.toml")
    }

    /// Apply `TASKBOARD_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `TASKBOARD_*` variables read through `lookup`. Empty values are
    /// ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", ENV_PORT, port))?;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(format) = get(ENV_LOG_FORMAT) {
            self.logging.format = format
                .parse()
                .with_context(|| format!("Invalid {}", ENV_LOG_FORMAT))?;
        }
        if let Some(dir) = get(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Apply command-line flags, the highest-precedence layer.
    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(ref host) = cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref path) = cli.db_path {
            self.database.path = path.clone();
        }
        if cli.dev {
            self.server.cors_permissive = true;
        }
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }
    }

    /// Resolve all layers: file (if present) → environment → CLI.
    pub fn resolve(path: &Path, cli: &CliOverrides) -> Result<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env()?;
        config.apply_cli(cli);
        Ok(config)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            db_path: self.database.path.clone(),
            cors_permissive: self.server.cors_permissive,
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.host.trim().is_empty() {
            warnings.push("server.host is empty".to_string());
        }
        if self.server.port == 0 {
            warnings.push("server.port is 0: the OS will pick a random port".to_string());
        }
        if self.database.path.as_os_str().is_empty() {
            warnings.push("database.path is empty".to_string());
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            warnings.push(format!(
                "Invalid logging.level '{}': expected a filter such as 'info' or 'taskboard=debug'",
                self.logging.level
            ));
        }
        if self.server.cors_permissive && self.server.host != "127.0.0.1" && self.server.host != "localhost" {
            warnings.push(format!(
                "server.cors_permissive is enabled while listening on {}",
                self.server.host
            ));
        }

        warnings
    }
}
