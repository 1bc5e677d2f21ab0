//! # API Configuration
//!
//! Process configuration for the RPC server. Business settings (tax rate,
//! code prefix) are not here; they live in the database settings table.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_PORT=9000                                                    │
//! │     TALLY_DB_PATH=/var/lib/tally/tally.db                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $TALLY_CONFIG, or                                                  │
//! │     ~/.config/tally-pos/tally.toml (Linux)                             │
//! │     ~/Library/Application Support/com.tally.pos/tally.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tally.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/tally/tally.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [engine]
//! max_conflict_retries = 5
//! max_code_attempts = 5
//! deadline_ms = 10000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use tally_db::{DbConfig, EngineConfig};

pub const CONFIG_PATH_ENV: &str = "TALLY_CONFIG";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// `[server]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `tally.db` in the platform data directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// `[engine]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,

    #[serde(default = "default_deadline")]
    pub deadline_ms: u64,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_conflict_retries() -> u32 {
    5
}

fn default_max_code_attempts() -> u32 {
    5
}

fn default_deadline() -> u64 {
    10_000
}

fn default_initial_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    500
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            max_conflict_retries: default_max_conflict_retries(),
            max_code_attempts: default_max_code_attempts(),
            deadline_ms: default_deadline(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// =============================================================================
// ApiConfig
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

impl ApiConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else `tally.toml` in the config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("TALLY_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = lookup("TALLY_PORT") {
            self.server.port = parse_var("TALLY_PORT", &port)?;
        }
        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("TALLY_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(retries) = lookup("TALLY_MAX_CONFLICT_RETRIES") {
            self.engine.max_conflict_retries = parse_var("TALLY_MAX_CONFLICT_RETRIES", &retries)?;
        }
        if let Some(ms) = lookup("TALLY_DEADLINE_MS") {
            self.engine.deadline_ms = parse_var("TALLY_DEADLINE_MS", &ms)?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.engine.max_code_attempts == 0 {
            return Err(ConfigError::Invalid(
                "engine.max_code_attempts must be greater than 0".into(),
            ));
        }
        if self.engine.deadline_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.deadline_ms must be greater than 0".into(),
            ));
        }
        if self.engine.initial_backoff_ms > self.engine.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "engine.initial_backoff_ms must not exceed engine.max_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Pool settings for [`tally_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_conflict_retries: self.engine.max_conflict_retries,
            max_code_attempts: self.engine.max_code_attempts,
            deadline: Duration::from_millis(self.engine.deadline_ms),
            initial_backoff: Duration::from_millis(self.engine.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.engine.max_backoff_ms),
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.validate().is_ok());

        let engine = config.engine_config();
        assert_eq!(engine.max_conflict_retries, 5);
        assert_eq!(engine.deadline, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [engine]
            deadline_ms = 2500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.engine.deadline_ms, 2500);
        assert_eq!(config.engine.max_code_attempts, 5);
        assert_eq!(config.database.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_PORT", "9100"),
            ("TALLY_DB_PATH", "/tmp/override.db"),
            ("TALLY_MAX_CONFLICT_RETRIES", "2"),
        ]
        .into_iter()
        .collect();

        let mut config = ApiConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.path, PathBuf::from("/tmp/override.db"));
        assert_eq!(config.engine.max_conflict_retries, 2);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = ApiConfig::default();
        let err = config
            .apply_overrides(|key| (key == "TALLY_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref k) if k == "TALLY_PORT"));
    }

    #[test]
    fn test_validation() {
        let mut config = ApiConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = ApiConfig::default();
        config.engine.initial_backoff_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("tally-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tally.toml");
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = ApiConfig::load(Some(path)).unwrap();
        assert_eq!(config.database.max_connections, 3);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ApiConfig::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[engine]"));
    }
}
