//! Configuration loading and typed config structures for the HMI backend.
//!
//! Configuration lives in an optional `hmi-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and
//! provides a loader that reads the file, applies environment overrides,
//! and validates the result. Every field has a default, so a missing file
//! or an empty document yields a working configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hmi_types::{PumpId, TankId};
use serde::Deserialize;

use crate::alerts::{AlertThresholds, ThresholdError, HIGH_THRESHOLD, LOW_THRESHOLD};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hmi-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The alert thresholds are unusable.
    #[error("invalid alert thresholds: {source}")]
    Thresholds {
        /// The underlying validation error.
        #[from]
        source: ThresholdError,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value} ({reason})")]
    Env {
        /// Name of the environment variable.
        var: &'static str,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level backend configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HmiConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Entity store location and pool sizing.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Alert threshold policy.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Plant topology (tank to pump wiring).
    #[serde(default)]
    pub plant: PlantConfig,

    /// Login credentials and the optional token gate.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Real-time fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

impl HmiConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values (see
    /// [`HmiConfig::apply_overrides`]), then the result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and
    /// [`ConfigError::Thresholds`] / [`ConfigError::Env`] on invalid values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_with(&contents, |key| std::env::var(key).ok())
    }

    /// Parse configuration from a YAML string, applying process
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Same as [`HmiConfig::from_file`], minus I/O.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Self::parse_with(yaml, |key| std::env::var(key).ok())
    }

    /// Parse configuration from a YAML string with an explicit variable
    /// lookup in place of the process environment.
    ///
    /// # Errors
    ///
    /// Same as [`HmiConfig::parse`].
    pub fn parse_with<F>(yaml: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `HMI_CONFIG` (or [`DEFAULT_CONFIG_FILE`]) if it exists,
    /// otherwise start from defaults. Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`HmiConfig::from_file`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HMI_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        if path.exists() {
            Self::from_file(&path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Self::parse("")
        }
    }

    /// Override values with environment variables when set.
    ///
    /// - `PORT` overrides `server.port`
    /// - `SQLITE_PATH` overrides `storage.sqlite_path`
    /// - `HMI_USERNAME` / `HMI_PASSWORD` override the login credentials
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `PORT` is not a valid port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("PORT") {
            self.server.port = val
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::Env {
                    var: "PORT",
                    value: val.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(val) = lookup("SQLITE_PATH") {
            self.storage.sqlite_path = val;
        }
        if let Some(val) = lookup("HMI_USERNAME") {
            self.auth.username = val;
        }
        if let Some(val) = lookup("HMI_PASSWORD") {
            self.auth.password = Some(val);
        }
        Ok(())
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Thresholds`] if the threshold pair is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.alerts.thresholds()?;
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind to. All interfaces by default so field devices on
    /// the local network can reach the ingestion endpoint.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Entity store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Path of the `SQLite` database file (created if missing).
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Alert threshold policy.
///
/// Deployed values have drifted between 40/95, 10/95 and 40/110; the
/// pair is configuration rather than code so the policy can change
/// without touching the evaluator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertsConfig {
    /// Levels at or below this raise a critical low alert.
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,

    /// Levels at or above this raise a high warning.
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
}

impl AlertsConfig {
    /// Build validated thresholds from this section.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError`] if either value is non-finite or
    /// `low_threshold >= high_threshold`.
    pub fn thresholds(&self) -> Result<AlertThresholds, ThresholdError> {
        AlertThresholds::new(self.low_threshold, self.high_threshold)
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            low_threshold: default_low_threshold(),
            high_threshold: default_high_threshold(),
        }
    }
}

/// Plant topology.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlantConfig {
    /// Which pump is driven by which tank's sensor.
    #[serde(default = "default_pump_map")]
    pub pump_map: BTreeMap<TankId, PumpId>,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            pump_map: default_pump_map(),
        }
    }
}

/// Login and token gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Accepted login user name.
    #[serde(default = "default_username")]
    pub username: String,

    /// Accepted login password. Login is disabled while unset.
    #[serde(default)]
    pub password: Option<String>,

    /// Require an issued token on the read routes and the real-time channel.
    #[serde(default)]
    pub require_token: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: None,
            require_token: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Real-time fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Snapshots buffered per subscriber before it is considered lagging.
    #[serde(default = "default_broadcast_capacity")]
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            capacity: default_broadcast_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_sqlite_path() -> String {
    "hmi-data.db".to_owned()
}

const fn default_max_connections() -> u32 {
    5
}

const fn default_low_threshold() -> f64 {
    LOW_THRESHOLD
}

const fn default_high_threshold() -> f64 {
    HIGH_THRESHOLD
}

fn default_pump_map() -> BTreeMap<TankId, PumpId> {
    let mut m = BTreeMap::new();
    m.insert(TankId::new("T-100"), PumpId::new("P-100"));
    m.insert(TankId::new("T-200"), PumpId::new("P-200"));
    m
}

fn default_username() -> String {
    "operador".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_broadcast_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_is_valid() {
        let config = HmiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.sqlite_path, "hmi-data.db");
        assert_eq!(config.plant.pump_map.len(), 2);
        assert_eq!(
            config.plant.pump_map.get(&TankId::new("T-100")),
            Some(&PumpId::new("P-100"))
        );
        assert!(config.auth.password.is_none());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9090

storage:
  sqlite_path: "/var/data/hmi.db"
  max_connections: 2

alerts:
  low_threshold: 10.0
  high_threshold: 110.0

plant:
  pump_map:
    T-300: P-300

auth:
  username: "admin"
  password: "secret"
  require_token: true

logging:
  level: "debug"
  json: true

broadcast:
  capacity: 16
"#;

        let config = HmiConfig::parse_with(yaml, no_env);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.storage.sqlite_path, "/var/data/hmi.db");
        assert_eq!(config.storage.max_connections, 2);
        assert!((config.alerts.low_threshold - 10.0).abs() < f64::EPSILON);
        assert!((config.alerts.high_threshold - 110.0).abs() < f64::EPSILON);
        assert_eq!(config.plant.pump_map.len(), 1);
        assert_eq!(config.auth.password.as_deref(), Some("secret"));
        assert!(config.auth.require_token);
        assert!(config.logging.json);
        assert_eq!(config.broadcast.capacity, 16);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "server:\n  port: 3000\n";
        let config = HmiConfig::parse_with(yaml, no_env).ok().unwrap_or_default();

        assert_eq!(config.server.port, 3000);
        // Everything else uses defaults
        assert_eq!(config.server.host, "0.0.0.0");
        assert!((config.alerts.low_threshold - LOW_THRESHOLD).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = HmiConfig::parse_with("", no_env);
        assert!(config.is_ok());
    }

    #[test]
    fn env_overrides_port_and_storage() {
        let lookup = |key: &str| match key {
            "PORT" => Some("10000".to_owned()),
            "SQLITE_PATH" => Some("/tmp/override.db".to_owned()),
            "HMI_PASSWORD" => Some("hunter2".to_owned()),
            _ => None,
        };
        let config = HmiConfig::parse_with("server:\n  port: 3000\n", lookup)
            .ok()
            .unwrap_or_default();

        assert_eq!(config.server.port, 10000);
        assert_eq!(config.storage.sqlite_path, "/tmp/override.db");
        assert_eq!(config.auth.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn invalid_port_override_is_rejected() {
        let lookup = |key: &str| (key == "PORT").then(|| "eighty".to_owned());
        let result = HmiConfig::parse_with("", lookup);
        assert!(matches!(result, Err(ConfigError::Env { var: "PORT", .. })));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let yaml = "alerts:\n  low_threshold: 95.0\n  high_threshold: 40.0\n";
        let result = HmiConfig::parse_with(yaml, no_env);
        assert!(matches!(result, Err(ConfigError::Thresholds { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(DEFAULT_CONFIG_FILE);
        if path.exists() {
            let config = HmiConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
