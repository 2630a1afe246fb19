//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Broadcast hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_max_subscribers() -> usize {
    1000
}

fn default_heartbeat_interval() -> u64 {
    5
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscribers: default_max_subscribers(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl From<&HubConfig> for crate::stream::HubConfig {
    fn from(config: &HubConfig) -> Self {
        Self {
            max_subscribers: config.max_subscribers,
            heartbeat_interval_secs: config.heartbeat_interval_secs,
        }
    }
}

/// Job supervisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_restart_delay")]
    pub restart_delay_ms: u64,
}

fn default_restart_delay() -> u64 {
    2000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay_ms: default_restart_delay(),
        }
    }
}

impl From<&SupervisorConfig> for crate::jobs::SupervisorConfig {
    fn from(config: &SupervisorConfig) -> Self {
        Self {
            restart_delay_ms: config.restart_delay_ms,
        }
    }
}

/// Built-in job configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    /// Directory holding per-job settings files (`<name>.json`)
    pub settings_dir: Option<String>,

    #[serde(default = "default_clock_interval")]
    pub clock_interval_ms: u64,

    #[serde(default = "default_uptime_interval")]
    pub uptime_interval_ms: u64,
}

fn default_clock_interval() -> u64 {
    1000
}

fn default_uptime_interval() -> u64 {
    5000
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            settings_dir: None,
            clock_interval_ms: default_clock_interval(),
            uptime_interval_ms: default_uptime_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("widgetcast").join("config.toml")),
            Some(PathBuf::from("/etc/widgetcast/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("WIDGETCAST_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WIDGETCAST_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric WIDGETCAST_PORT {:?}", port);
                }
            }
        }

        if let Ok(dir) = std::env::var("WIDGETCAST_JOBS_DIR") {
            self.jobs.settings_dir = Some(dir);
        }

        if let Ok(level) = std::env::var("WIDGETCAST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WIDGETCAST_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Widgetcast Configuration
#
# Environment variables override these settings:
# - WIDGETCAST_HOST
# - WIDGETCAST_PORT
# - WIDGETCAST_JOBS_DIR
# - WIDGETCAST_LOG_LEVEL
# - WIDGETCAST_LOG_FORMAT

[server]
# Server host
host = "0.0.0.0"

# Server port
port = 4000

[hub]
# Maximum concurrent SSE subscribers
max_subscribers = 1000

# Keepalive tick period (seconds)
heartbeat_interval_secs = 5

[supervisor]
# Delay before restarting a crashed job unit (ms)
restart_delay_ms = 2000

[jobs]
# Directory with per-job settings files (<name>.json)
# settings_dir = "/etc/widgetcast/jobs"

# Clock job emit interval (ms)
clock_interval_ms = 1000

# Uptime job emit interval (ms)
uptime_interval_ms = 5000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.hub.heartbeat_interval_secs, 5);
        assert_eq!(config.supervisor.restart_delay_ms, 2000);
        assert_eq!(config.jobs.clock_interval_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "[server]\nport = 9000\n\n[supervisor]\nrestart_delay_ms = 500\n"
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.supervisor.restart_delay_ms, 500);
        assert_eq!(config.hub.max_subscribers, 1000);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_port_override_ignores_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();

        std::env::set_var("WIDGETCAST_PORT", "not-a-port");
        let config = Config::load_with_env(&path).unwrap();
        std::env::remove_var("WIDGETCAST_PORT");

        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_generated_default_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_section_conversions() {
        let config = Config::default();
        let hub: crate::stream::HubConfig = (&config.hub).into();
        assert_eq!(hub.max_subscribers, 1000);

        let supervisor: crate::jobs::SupervisorConfig = (&config.supervisor).into();
        assert_eq!(supervisor.restart_delay_ms, 2000);
    }
}
