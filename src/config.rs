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
    pub store: StoreConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which backing store the bridge adapts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Shared in-memory map (ephemeral)
    #[default]
    Memory,
    /// One file per key on disk
    File,
}

/// Backing store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Root directory for the file backend
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Optional capacity limit enforced by the backend
    pub quota_bytes: Option<u64>,
}

fn default_namespace() -> String {
    "app".to_string()
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("portstore").to_string_lossy().to_string())
        .unwrap_or_else(|| "./portstore_data".to_string())
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            namespace: default_namespace(),
            data_dir: default_data_dir(),
            quota_bytes: None,
        }
    }
}

/// Bridge behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Forward external store changes as notification responses
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_notifications() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            notifications: default_notifications(),
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

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("portstore").join("config.toml")),
            Some(PathBuf::from("/etc/portstore/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
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

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(backend) = std::env::var("PORTSTORE_BACKEND") {
            match backend.as_str() {
                "memory" => self.store.backend = Backend::Memory,
                "file" => self.store.backend = Backend::File,
                other => tracing::warn!(backend = %other, "Unknown PORTSTORE_BACKEND ignored"),
            }
        }
        if let Ok(namespace) = std::env::var("PORTSTORE_NAMESPACE") {
            self.store.namespace = namespace;
        }
        if let Ok(data_dir) = std::env::var("PORTSTORE_DATA_DIR") {
            self.store.data_dir = data_dir;
        }

        if let Ok(level) = std::env::var("PORTSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PORTSTORE_LOG_FORMAT") {
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
    r#"# Portstore Configuration
#
# Environment variables override these settings:
# - PORTSTORE_BACKEND
# - PORTSTORE_NAMESPACE
# - PORTSTORE_DATA_DIR
# - PORTSTORE_LOG_LEVEL
# - PORTSTORE_LOG_FORMAT

[store]
# Backing store: "memory" or "file"
backend = "memory"

# Storage namespace; entries outside it are never touched
namespace = "app"

# Root directory for the file backend
data_dir = "~/.local/share/portstore"

# Optional capacity limit in bytes
# quota_bytes = 5242880

[bridge]
# Forward external store changes as notification responses
notifications = true

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

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, Backend::Memory);
        assert_eq!(config.store.namespace, "app");
        assert_eq!(config.store.quota_bytes, None);
        assert!(config.bridge.notifications);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            [store]
            backend = "file"
            namespace = "notes"
            quota_bytes = 1024

            [bridge]
            notifications = false
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.store.backend, Backend::File);
        assert_eq!(config.store.namespace, "notes");
        assert_eq!(config.store.quota_bytes, Some(1024));
        assert!(!config.bridge.notifications);
        // Unspecified sections fall back to defaults
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_generated_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.store.backend, Backend::Memory);
        assert!(config.bridge.notifications);
    }
}
