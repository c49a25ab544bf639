//! Tests for the configuration loader.
//!
//! Responsibilities:
//! - Test `StorageSettings` builder precedence and backend selection.
//! - Test environment variable handling.
//! - Test `.env` loading gates.
//! - Test `LocalStorage` discovery, loading and decryption.
//!
//! Invariants:
//! - Tests use `serial_test` to prevent environment variable pollution.
//! - Tests use `global_test_lock()` for additional synchronization.
//! - Temporary directories are cleaned up automatically via `tempfile`.

use std::path::Path;
use std::sync::Mutex;

pub mod basic_tests;

/// Returns the global test lock for environment variable isolation.
pub fn env_lock() -> &'static Mutex<()> {
    crate::test_util::global_test_lock()
}

/// Writes `<name>.json` with `content` into `dir`.
pub fn write_config(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(format!("{name}.json")), content).unwrap();
}
