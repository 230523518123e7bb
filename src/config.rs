//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::dashboard::{ClientConfig, DEFAULT_API_BASE};
use crate::pipeline::{TrainingConfig, INSIGHTS_FILE, MODEL_FILE};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Input export and processed artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_raw_csv")]
    pub raw_csv: PathBuf,

    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
}

fn default_raw_csv() -> PathBuf {
    PathBuf::from("data/raw/SR2025.csv")
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_csv: default_raw_csv(),
            processed_dir: default_processed_dir(),
        }
    }
}

impl DataConfig {
    pub fn insights_path(&self) -> PathBuf {
        self.processed_dir.join(INSIGHTS_FILE)
    }

    pub fn model_path(&self) -> PathBuf {
        self.processed_dir.join(MODEL_FILE)
    }
}

/// Dashboard client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Unset means requests wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl ClientSection {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

impl LoggingConfig {
    /// Filter directives used when `RUST_LOG` is unset. A bare level applies
    /// to this crate and the HTTP layer; anything else is used verbatim.
    pub fn filter_directives(&self) -> String {
        if self.level.contains('=') || self.level.contains(',') {
            self.level.clone()
        } else {
            format!("civic311={0},tower_http={0}", self.level)
        }
    }

    /// Install the global subscriber
    pub fn init(&self) -> Result<(), tracing_subscriber::util::TryInitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directives()));

        let registry = tracing_subscriber::registry().with(filter);
        if self.format.eq_ignore_ascii_case("json") {
            registry.with(tracing_subscriber::fmt::layer().json()).try_init()
        } else {
            registry.with(tracing_subscriber::fmt::layer()).try_init()
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

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Default config file locations, in search order
    pub fn search_paths() -> Vec<PathBuf> {
        [
            dirs::config_dir().map(|p| p.join("civic311").join("config.toml")),
            Some(PathBuf::from("/etc/civic311/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Load from an explicit path, the default locations, or environment
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        for path in Self::search_paths() {
            if path.exists() {
                match Self::load_with_env(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // API overrides
        if let Some(host) = var("CIVIC311_API_HOST") {
            self.api.host = host;
        }
        if let Some(port) = var("CIVIC311_API_PORT") {
            match port.parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid CIVIC311_API_PORT: {}", port),
            }
        }

        // Data overrides
        if let Some(raw_csv) = var("CIVIC311_RAW_CSV") {
            self.data.raw_csv = PathBuf::from(raw_csv);
        }
        if let Some(data_dir) = var("CIVIC311_DATA_DIR") {
            self.data.processed_dir = PathBuf::from(data_dir);
        }

        // Client overrides
        if let Some(url) = var("CIVIC311_API_URL") {
            self.client.base_url = url;
        }

        // Logging overrides
        if let Some(level) = var("CIVIC311_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CIVIC311_LOG_FORMAT") {
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
    r#"# Civic311 Configuration
#
# Environment variables override these settings:
# - CIVIC311_API_HOST
# - CIVIC311_API_PORT
# - CIVIC311_RAW_CSV
# - CIVIC311_DATA_DIR
# - CIVIC311_API_URL
# - CIVIC311_LOG_LEVEL
# - CIVIC311_LOG_FORMAT

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 5000

# Allowed CORS origins (empty allows any origin)
cors_origins = []

[data]
# Raw service request export (Latin-1 CSV)
raw_csv = "data/raw/SR2025.csv"

# Directory holding insights.json and model.json
processed_dir = "data/processed"

[client]
# Base URL of the dashboard API
base_url = "http://localhost:5000/api"

# Request timeout in seconds (unset waits indefinitely)
# request_timeout_secs = 30

[training]
# Gradient descent passes over the training split
epochs = 300

# Step size
learning_rate = 0.5

# L2 penalty on weights
l2 = 0.0001

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
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.port, 5000);
        assert!(config.api.cors_origins.is_empty());
        assert_eq!(config.client.base_url, "http://localhost:5000/api");
        assert_eq!(config.client.client_config().timeout, None);
        assert_eq!(
            config.data.model_path(),
            PathBuf::from("data/processed/model.json")
        );
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.api.addr(), defaults.api.addr());
        assert_eq!(config.data.raw_csv, defaults.data.raw_csv);
        assert_eq!(config.training, defaults.training);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nport = 8080\n\n[client]\nrequest_timeout_secs = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(
            config.client.client_config().timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(config.training.epochs, 300);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nport = ").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            Config::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CIVIC311_API_PORT", "6000"),
            ("CIVIC311_DATA_DIR", "/tmp/processed"),
            ("CIVIC311_API_URL", "http://backend:5000/api"),
            ("CIVIC311_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api.port, 6000);
        assert_eq!(config.data.processed_dir, PathBuf::from("/tmp/processed"));
        assert_eq!(config.client.base_url, "http://backend:5000/api");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|name| (name == "CIVIC311_API_PORT").then(|| "http".to_string()));
        assert_eq!(config.api.port, 5000);
    }

    #[test]
    fn test_filter_directives() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.filter_directives(), "civic311=info,tower_http=info");

        let custom = LoggingConfig {
            level: "civic311=trace".into(),
            ..Default::default()
        };
        assert_eq!(custom.filter_directives(), "civic311=trace");
    }
}
