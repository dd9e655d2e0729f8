//! Configuration Loader
//!
//! Resolves the effective configuration from defaults, an optional YAML/JSON
//! file and `TASKTREE_*` environment variables, in that order of precedence.
//! Command line flags are applied on top by the binary.

use crate::config::{TaskTreeConfig, CONFIG_ENV};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader that handles multiple sources with precedence
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: TaskTreeConfig,
    config_path: Option<PathBuf>,
    load_from_env: bool,
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: TaskTreeConfig::default(),
            config_path: None,
            load_from_env: true,
            validate: true,
        }
    }

    /// Set the base configuration
    #[must_use]
    pub fn with_base_config(mut self, config: TaskTreeConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Read this configuration file instead of the one named by `TASKTREE_CONFIG`
    #[must_use]
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable loading from environment variables
    #[must_use]
    pub fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    /// Enable or disable configuration validation
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Load configuration from all sources
    ///
    /// An explicitly named file must exist; a missing file is an error rather
    /// than being skipped.
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or the result is invalid
    pub fn load(&self) -> Result<TaskTreeConfig> {
        self.load_with(|key| std::env::var(key).ok())
    }

    /// [`ConfigLoader::load`] with a custom environment lookup
    ///
    /// # Errors
    /// Returns an error if a source cannot be read or the result is invalid
    pub fn load_with<F>(&self, lookup: F) -> Result<TaskTreeConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.base_config.clone();

        let path = self.config_path.clone().or_else(|| {
            if self.load_from_env {
                lookup(CONFIG_ENV).map(PathBuf::from)
            } else {
                None
            }
        });

        if let Some(path) = path {
            debug!("Loading configuration from file: {}", path.display());
            config = TaskTreeConfig::from_file(&path)?;
            info!("Loaded configuration from: {}", path.display());
        }

        if self.load_from_env {
            config.apply_env(&lookup)?;
        }

        if self.validate {
            config.validate()?;
        }

        debug!(?config, "Configuration resolved");
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from the default sources
///
/// # Errors
/// Returns an error if a source cannot be read or the result is invalid
pub fn load_config(path: Option<&Path>) -> Result<TaskTreeConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_config_path(path);
    }
    loader.load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskTreeError;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::new().load_with(env(&[])).unwrap();
        assert_eq!(config, TaskTreeConfig::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        std::fs::write(file.path(), "server:\n  port: 9100\n  host: 0.0.0.0\n").unwrap();

        let config = ConfigLoader::new()
            .with_config_path(file.path())
            .load_with(env(&[("TASKTREE_PORT", "9200")]))
            .unwrap();

        assert_eq!(config.server.port, 9200);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_config_file_from_env_variable() {
        let file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        std::fs::write(file.path(), "validation:\n  strict_dates: false\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = ConfigLoader::new()
            .load_with(env(&[(CONFIG_ENV, path.as_str())]))
            .unwrap();
        assert!(!config.validation.strict_dates);
    }

    #[test]
    fn test_env_loading_disabled() {
        let config = ConfigLoader::new()
            .with_env_loading(false)
            .load_with(env(&[("TASKTREE_PORT", "9200")]))
            .unwrap();
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .with_config_path("/definitely/not/here.yaml")
            .load_with(env(&[]))
            .unwrap_err();
        assert!(matches!(err, TaskTreeError::Configuration { .. }));
    }

    #[test]
    fn test_validation_can_be_skipped() {
        let mut base = TaskTreeConfig::default();
        base.server.port = 0;

        let loader = ConfigLoader::new().with_base_config(base);
        assert!(loader.clone().load_with(env(&[])).is_err());
        assert!(loader.with_validation(false).load_with(env(&[])).is_ok());
    }
}
