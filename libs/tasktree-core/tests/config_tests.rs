//! Configuration loading against the real process environment

use serial_test::serial;
use std::io::Write;
use tasktree_core::{ConfigLoader, TaskTreeConfig, TaskTreeError};

const VARS: &[&str] = &[
    "TASKTREE_CONFIG",
    "TASKTREE_DATABASE_PATH",
    "TASKTREE_HOST",
    "TASKTREE_PORT",
    "TASKTREE_LOG_LEVEL",
    "TASKTREE_LOG_JSON",
    "TASKTREE_STRICT_DATES",
    "TASKTREE_ENFORCE_DATE_ORDER",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "database_path: from-file.db\nserver:\n  port: 9100").unwrap();

    std::env::set_var("TASKTREE_CONFIG", file.path());
    std::env::set_var("TASKTREE_PORT", "9200");
    let config = ConfigLoader::new().load().unwrap();
    clear_env();

    assert_eq!(config.database_path.to_str(), Some("from-file.db"));
    assert_eq!(config.server.port, 9200);
}

#[test]
#[serial]
fn test_invalid_flag_is_configuration_error() {
    clear_env();
    std::env::set_var("TASKTREE_STRICT_DATES", "maybe");
    let result = TaskTreeConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(TaskTreeError::Configuration { .. })));
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = ConfigLoader::new().load().unwrap();

    assert_eq!(config, TaskTreeConfig::default());
    assert!(config.validation.strict_dates);
    assert!(config.validation.enforce_date_order);
}
