//! Unit tests for TOML configuration parsing and precedence.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use kinship::config::{AppConfig, DEFAULT_DATABASE};
use kinship_core::EngineConfig;
use std::path::{Path, PathBuf};

// =============================================================================
// PARSING TESTS
// =============================================================================

#[test]
fn test_empty_config_uses_defaults() {
    let config = AppConfig::from_toml("").unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.engine, EngineConfig::default());
}

#[test]
fn test_full_config() {
    let config = AppConfig::from_toml(
        r#"
        [engine]
        suggestion_depth = 5
        transplant_attempts = 7

        [storage]
        database = "family.redb"
        "#,
    )
    .unwrap();

    assert_eq!(config.engine.suggestion_depth, 5);
    assert_eq!(config.engine.transplant_attempts, 7);
    assert_eq!(config.storage.database, Some(PathBuf::from("family.redb")));
}

#[test]
fn test_partial_engine_table() {
    let config = AppConfig::from_toml("[engine]\nsuggestion_depth = 1\n").unwrap();
    assert_eq!(config.engine.suggestion_depth, 1);
    assert_eq!(
        config.engine.transplant_attempts,
        EngineConfig::default().transplant_attempts
    );
}

#[test]
fn test_unknown_table_rejected() {
    assert!(AppConfig::from_toml("[server]\nport = 80\n").is_err());
}

#[test]
fn test_bad_value_rejected() {
    assert!(AppConfig::from_toml("[engine]\nsuggestion_depth = \"deep\"\n").is_err());
}

// =============================================================================
// PRECEDENCE TESTS
// =============================================================================

#[test]
fn test_database_precedence() {
    let config = AppConfig::from_toml("[storage]\ndatabase = \"file.redb\"\n").unwrap();
    assert_eq!(config.database(None), PathBuf::from("file.redb"));
    assert_eq!(
        config.database(Some(Path::new("flag.redb"))),
        PathBuf::from("flag.redb")
    );
    assert_eq!(
        AppConfig::default().database(None),
        PathBuf::from(DEFAULT_DATABASE)
    );
}

#[test]
fn test_depth_override_is_clamped() {
    let config = AppConfig::default();
    assert_eq!(config.engine(Some(2)).suggestion_depth, 2);
    assert_eq!(
        config.engine(Some(500)).suggestion_depth,
        kinship_core::primitives::MAX_SUGGESTION_DEPTH
    );
}

// =============================================================================
// FILE LOADING TESTS
// =============================================================================

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kinship.toml");
    std::fs::write(&path, "[engine]\ntransplant_attempts = 4\n").unwrap();

    let config = AppConfig::load(Some(&path)).unwrap();
    assert_eq!(config.engine.transplant_attempts, 4);
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}
