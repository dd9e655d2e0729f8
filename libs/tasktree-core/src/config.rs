//! Configuration for the tasktree service

use crate::database::DatabasePoolConfig;
use crate::error::{Result, TaskTreeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tasktree_common::{DATABASE_FILENAME, DEFAULT_HOST, DEFAULT_PORT};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "TASKTREE_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskTreeConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub validation: ValidationSettings,
    pub pool: PoolSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `tasktree_core=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

/// Input validation switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Reject tasks whose due date is before their start date
    pub enforce_date_order: bool,
    /// Reject unparseable dates on create instead of substituting the current time
    pub strict_dates: bool,
}

/// Connection pool settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for TaskTreeConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DATABASE_FILENAME),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            validation: ValidationSettings::default(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            enforce_date_order: true,
            strict_dates: true,
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

impl TaskTreeConfig {
    /// Load configuration from a YAML or JSON file
    ///
    /// Fields missing from the file keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaskTreeError::configuration(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                TaskTreeError::configuration(format!("Failed to parse JSON config: {e}"))
            }),
            _ => serde_yaml::from_str(&content).map_err(|e| {
                TaskTreeError::configuration(format!("Failed to parse YAML config: {e}"))
            }),
        }
    }

    /// Save configuration to a file (`yaml` or `json`)
    ///
    /// # Errors
    /// Returns an error if serialization fails or the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let content = match format {
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| {
                TaskTreeError::configuration(format!("Failed to serialize YAML: {e}"))
            })?,
            "json" => serde_json::to_string_pretty(self)?,
            _ => {
                return Err(TaskTreeError::configuration(format!(
                    "Unsupported format: {format}"
                )))
            }
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build a configuration from defaults and the process environment
    ///
    /// # Errors
    /// Returns an error if an environment variable holds an invalid value
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Override fields from `TASKTREE_*` variables resolved by `lookup`
    ///
    /// # Errors
    /// Returns an error if a variable holds an invalid value
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("TASKTREE_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Some(host) = lookup("TASKTREE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TASKTREE_PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                TaskTreeError::configuration(format!("Invalid TASKTREE_PORT: {port}"))
            })?;
        }
        if let Some(level) = lookup("TASKTREE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("TASKTREE_LOG_JSON") {
            self.logging.json = parse_flag("TASKTREE_LOG_JSON", &json)?;
        }
        if let Some(strict) = lookup("TASKTREE_STRICT_DATES") {
            self.validation.strict_dates = parse_flag("TASKTREE_STRICT_DATES", &strict)?;
        }
        if let Some(order) = lookup("TASKTREE_ENFORCE_DATE_ORDER") {
            self.validation.enforce_date_order =
                parse_flag("TASKTREE_ENFORCE_DATE_ORDER", &order)?;
        }
        Ok(())
    }

    /// Check the configuration for values the service cannot run with
    ///
    /// # Errors
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(TaskTreeError::configuration("Database path cannot be empty"));
        }
        if self.server.host.trim().is_empty() {
            return Err(TaskTreeError::configuration("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(TaskTreeError::configuration("Server port must be greater than 0"));
        }
        if self.pool.max_connections == 0 {
            return Err(TaskTreeError::configuration(
                "Max connections must be greater than 0",
            ));
        }
        if self.pool.acquire_timeout_secs == 0 {
            return Err(TaskTreeError::configuration(
                "Acquire timeout must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Connection pool configuration derived from these settings
    #[must_use]
    pub fn pool_config(&self) -> DatabasePoolConfig {
        DatabasePoolConfig {
            max_connections: self.pool.max_connections,
            acquire_timeout: Duration::from_secs(self.pool.acquire_timeout_secs),
            ..DatabasePoolConfig::default()
        }
    }

    /// `host:port` the HTTP server binds to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TaskTreeError::configuration(format!(
            "Invalid boolean for {name}: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TaskTreeConfig::default();

        assert_eq!(config.database_path, PathBuf::from("tasktree.db"));
        assert_eq!(config.server.port, 8000);
        assert!(config.validation.strict_dates);
        assert!(config.validation.enforce_date_order);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = TaskTreeConfig::default();
        config
            .apply_env(lookup(&[
                ("TASKTREE_DATABASE_PATH", "/tmp/other.db"),
                ("TASKTREE_PORT", "9001"),
                ("TASKTREE_LOG_JSON", "true"),
                ("TASKTREE_STRICT_DATES", "0"),
                ("TASKTREE_ENFORCE_DATE_ORDER", "off"),
            ]))
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.server.port, 9001);
        assert!(config.logging.json);
        assert!(!config.validation.strict_dates);
        assert!(!config.validation.enforce_date_order);
    }

    #[test]
    fn test_apply_env_rejects_invalid_values() {
        let mut config = TaskTreeConfig::default();
        let err = config
            .apply_env(lookup(&[("TASKTREE_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, TaskTreeError::Configuration { .. }));

        let err = config
            .apply_env(lookup(&[("TASKTREE_STRICT_DATES", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, TaskTreeError::Configuration { .. }));
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = TaskTreeConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = TaskTreeConfig::default();
        config.pool.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(
            file.path(),
            "database_path: data/tasks.db\nserver:\n  port: 9100\n",
        )
        .unwrap();

        let config = TaskTreeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/tasks.db"));
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.validation.strict_dates);
    }

    #[test]
    fn test_file_round_trip_json() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let mut config = TaskTreeConfig::default();
        config.logging.level = "debug".to_string();

        config.to_file(file.path(), "json").unwrap();
        let loaded = TaskTreeConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "server: [not, a, map]").unwrap();

        let err = TaskTreeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, TaskTreeError::Configuration { .. }));
    }

    #[test]
    fn test_pool_config_and_bind_address() {
        let mut config = TaskTreeConfig::default();
        config.pool.max_connections = 4;
        config.pool.acquire_timeout_secs = 5;

        let pool = config.pool_config();
        assert_eq!(pool.max_connections, 4);
        assert_eq!(pool.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }
}
