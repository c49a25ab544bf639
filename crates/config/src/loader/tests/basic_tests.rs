//! Basic tests for the storage settings builder.
//!
//! Responsibilities:
//! - Test explicit directory selection and `~` expansion.
//! - Test backend name validation.

use std::path::PathBuf;

use crate::loader::builder::StorageSettings;
use crate::loader::error::ConfigError;
use crate::loader::path::home_dir;
use tempfile::TempDir;

#[test]
fn test_explicit_config_dir_is_used() {
    let settings = StorageSettings::new().with_config_dir("/srv/sql_connectors");
    assert_eq!(
        settings.resolve_config_dir().unwrap(),
        PathBuf::from("/srv/sql_connectors")
    );
}

#[test]
fn test_config_dir_beats_path_or_uri() {
    let settings = StorageSettings::new()
        .with_path_or_uri("/from/location")
        .with_config_dir("/from/dir");
    assert_eq!(settings.resolve_config_dir().unwrap(), PathBuf::from("/from/dir"));
}

#[test]
fn test_path_or_uri_used_without_config_dir() {
    let settings = StorageSettings::new().with_path_or_uri("/from/location");
    assert_eq!(
        settings.resolve_config_dir().unwrap(),
        PathBuf::from("/from/location")
    );
}

#[test]
fn test_tilde_is_expanded() {
    let settings = StorageSettings::new().with_config_dir("~/sql");
    assert_eq!(
        settings.resolve_config_dir().unwrap(),
        home_dir().unwrap().join("sql")
    );
}

#[test]
fn test_default_dir_when_nothing_set() {
    let dir = StorageSettings::new().resolve_config_dir().unwrap();
    assert!(dir.ends_with(".config/sql_connectors"));
}

#[test]
fn test_build_local_storage() {
    let temp_dir = TempDir::new().unwrap();

    let storage = StorageSettings::new()
        .with_config_dir(temp_dir.path())
        .build()
        .unwrap();

    assert_eq!(storage.base_dir(), temp_dir.path());
}

#[test]
fn test_legacy_storage_name_accepted() {
    let temp_dir = TempDir::new().unwrap();

    let result = StorageSettings::new()
        .with_config_dir(temp_dir.path())
        .with_storage("sql_connectors.storage.LocalStorage")
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_unknown_storage_rejected() {
    let result = StorageSettings::new()
        .with_config_dir("/any/dir")
        .with_storage("s3")
        .build();

    match result {
        Err(ConfigError::UnknownStorage(name)) => assert_eq!(name, "s3"),
        other => panic!("expected UnknownStorage, got {other:?}"),
    }
}
