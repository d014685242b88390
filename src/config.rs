//! Configuration module for tiny-httpd.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the HTTP server
#[derive(Parser, Debug, Default)]
#[command(name = "tiny-httpd")]
#[command(author = "tiny-httpd authors")]
#[command(version = "0.1.0")]
#[command(about = "A minimal HTTP/1.0 server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (empty = all interfaces)
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum number of pending connections queued by the kernel
    #[arg(short, long)]
    pub backlog: Option<i32>,

    /// Seconds to wait for listener readiness per poll iteration
    #[arg(long)]
    pub poll_interval: Option<f64>,

    /// Socket read/write timeout in seconds for accepted connections
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Maximum length of the request line and of each header line, in bytes
    #[arg(long)]
    pub max_header_size: Option<usize>,

    /// Maximum number of header lines per request
    #[arg(long)]
    pub max_headers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,
    /// Socket timeout in seconds (unset = block forever)
    pub timeout: Option<f64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            backlog: default_backlog(),
            poll_interval: default_poll_interval(),
            timeout: None,
        }
    }
}

/// Per-request parsing limits
#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,
    #[serde(default = "default_max_headers")]
    pub max_headers: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_size: default_max_header_size(),
            max_headers: default_max_headers(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_backlog() -> i32 {
    5
}

fn default_poll_interval() -> f64 {
    0.5
}

fn default_max_header_size() -> usize {
    65536
}

fn default_max_headers() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backlog: i32,
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
    pub max_header_size: usize,
    pub max_headers: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let toml_config = TomlConfig::default();
        Config {
            host: toml_config.server.host,
            port: toml_config.server.port,
            backlog: toml_config.server.backlog,
            poll_interval: Duration::from_secs_f64(toml_config.server.poll_interval),
            timeout: None,
            max_header_size: toml_config.limits.max_header_size,
            max_headers: toml_config.limits.max_headers,
            log_level: toml_config.logging.level,
        }
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence) and validate.
    pub fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let poll_interval = cli
            .poll_interval
            .unwrap_or(toml_config.server.poll_interval);
        let timeout = cli.timeout.or(toml_config.server.timeout);

        let config = Config {
            host: cli.host.unwrap_or(toml_config.server.host),
            port: cli.port.unwrap_or(toml_config.server.port),
            backlog: cli.backlog.unwrap_or(toml_config.server.backlog),
            poll_interval: seconds("poll_interval", poll_interval)?,
            timeout: timeout.map(|t| seconds("timeout", t)).transpose()?,
            max_header_size: cli
                .max_header_size
                .unwrap_or(toml_config.limits.max_header_size),
            max_headers: cli.max_headers.unwrap_or(toml_config.limits.max_headers),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };

        if config.max_header_size == 0 {
            return Err(ConfigError::Invalid(
                "max_header_size",
                "must be greater than zero".to_string(),
            ));
        }
        if config.backlog <= 0 {
            return Err(ConfigError::Invalid(
                "backlog",
                "must be greater than zero".to_string(),
            ));
        }
        config.bind_addr()?;

        Ok(config)
    }

    /// Resolve the listening endpoint. An empty host binds all interfaces.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.is_empty() {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        } else {
            self.host.parse().map_err(|_| {
                ConfigError::Invalid("host", format!("'{}' is not an IP address", self.host))
            })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Invalid(
            field,
            format!("{} is not a positive number of seconds", value),
        ));
    }
    Ok(Duration::from_secs_f64(value))
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(field, reason) => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
