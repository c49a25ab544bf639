//! Environment variable parsing for storage settings.
//!
//! Responsibilities:
//! - Read the `SQL_CONNECTORS_*` variables that select and locate config storage.
//! - Apply them to a `StorageSettings` instance without overriding explicit values.
//! - Provide a helper for reading env vars with empty/whitespace filtering.
//!
//! Does NOT handle:
//! - Reading configuration files (see storage.rs).
//! - `.env` file loading (handled by `StorageSettings::load_dotenv`).
//!
//! Invariants:
//! - Values already set on the builder take precedence over environment variables.
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed (leading/trailing whitespace removed).

use std::path::PathBuf;

use super::builder::StorageSettings;
use crate::constants::{ENV_CONFIG_DIR, ENV_PATH_OR_URI, ENV_STORAGE};

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Apply environment variable configuration to the settings.
///
/// Only fields that are still unset are filled in.
pub fn apply_env(settings: &mut StorageSettings) {
    if settings.config_dir().is_none()
        && let Some(dir) = env_var_or_none(ENV_CONFIG_DIR)
    {
        settings.set_config_dir(Some(PathBuf::from(dir)));
    }
    if settings.path_or_uri().is_none()
        && let Some(location) = env_var_or_none(ENV_PATH_OR_URI)
    {
        settings.set_path_or_uri(Some(location));
    }
    if settings.storage().is_none()
        && let Some(storage) = env_var_or_none(ENV_STORAGE)
    {
        settings.set_storage(Some(storage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_var_or_none_filters_empty_and_whitespace_strings() {
        let key = "_SQLC_TEST_UNSET_VAR";
        assert!(env_var_or_none(key).is_none(), "Unset env var should return None");

        temp_env::with_vars([(key, Some(""))], || {
            assert!(env_var_or_none(key).is_none(), "Empty env var should return None");
        });

        temp_env::with_vars([(key, Some("   "))], || {
            assert!(
                env_var_or_none(key).is_none(),
                "Whitespace-only env var should return None"
            );
        });

        temp_env::with_vars([(key, Some(" value "))], || {
            assert_eq!(env_var_or_none(key), Some("value".to_string()));
        });
    }

    #[test]
    #[serial]
    fn test_apply_env_does_not_override_explicit_values() {
        temp_env::with_vars(
            [
                (ENV_CONFIG_DIR, Some("/from/env")),
                (ENV_STORAGE, Some("elsewhere")),
            ],
            || {
                let mut settings = StorageSettings::new()
                    .with_config_dir(PathBuf::from("/explicit"))
                    .with_storage("local");
                apply_env(&mut settings);

                assert_eq!(settings.config_dir(), Some(PathBuf::from("/explicit").as_path()));
                assert_eq!(settings.storage(), Some("local"));
            },
        );
    }
}
