//! Storage settings builder.
//!
//! Responsibilities:
//! - Provide a builder-pattern `StorageSettings` that selects a storage backend
//!   and the directory it reads from.
//! - Merge explicit builder values, environment variables and defaults.
//! - Build the final `ConfigStorage`.
//!
//! Does NOT handle:
//! - Direct environment variable parsing logic (delegated to env.rs).
//! - Reading or parsing configuration files (see storage.rs).
//!
//! Invariants / Assumptions:
//! - Builder methods take precedence over environment variables.
//! - Directory precedence: explicit > `SQL_CONNECTORS_CONFIG_DIR` >
//!   `SQL_CONNECTORS_PATH_OR_URI` > `~/.config/sql_connectors`.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::env::apply_env;
use super::error::ConfigError;
use super::path::{default_config_dir, expand_home};
use super::storage::{ConfigStorage, LocalStorage};
use crate::constants::{ENV_DOTENV_DISABLED, LEGACY_LOCAL_STORAGE, LOCAL_STORAGE};
use crate::encryption::MasterKeySource;

/// Settings that determine where configurations are read from.
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    config_dir: Option<PathBuf>,
    path_or_uri: Option<String>,
    storage: Option<String>,
    key_source: Option<MasterKeySource>,
}

impl StorageSettings {
    /// Create empty settings; every field falls back to env or defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var(ENV_DOTENV_DISABLED).ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// If `DOTENV_DISABLED` environment variable is set to "true" or "1",
    /// the .env file will not be loaded (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `.env` file exists but has invalid syntax (`ConfigError::DotenvParse`)
    /// - The `.env` file exists but cannot be read due to I/O errors (`ConfigError::DotenvIo`)
    ///
    /// Missing `.env` files are silently ignored (returns `Ok(self)`).
    ///
    /// SAFETY: Error messages never include raw .env line contents to prevent secret leakage.
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if Self::is_not_found(&e) => Ok(self),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Read settings from environment variables, keeping values already set.
    pub fn from_env(mut self) -> Self {
        apply_env(&mut self);
        self
    }

    /// Override the configuration directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Set the location handed to the storage backend.
    pub fn with_path_or_uri(mut self, location: impl Into<String>) -> Self {
        self.path_or_uri = Some(location.into());
        self
    }

    /// Select the storage backend by name.
    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }

    /// Set where the key for encrypted values comes from.
    pub fn with_key_source(mut self, key_source: MasterKeySource) -> Self {
        self.key_source = Some(key_source);
        self
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn path_or_uri(&self) -> Option<&str> {
        self.path_or_uri.as_deref()
    }

    pub fn storage(&self) -> Option<&str> {
        self.storage.as_deref()
    }

    pub(crate) fn set_config_dir(&mut self, dir: Option<PathBuf>) {
        self.config_dir = dir;
    }

    pub(crate) fn set_path_or_uri(&mut self, location: Option<String>) {
        self.path_or_uri = location;
    }

    pub(crate) fn set_storage(&mut self, storage: Option<String>) {
        self.storage = storage;
    }

    /// The directory configurations are read from, with `~` expanded.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigDirUnavailable`] if the home directory is
    /// needed but cannot be determined.
    pub fn resolve_config_dir(&self) -> Result<PathBuf, ConfigError> {
        let explicit = self
            .config_dir
            .clone()
            .or_else(|| self.path_or_uri.as_ref().map(PathBuf::from));

        let dir = match explicit {
            Some(dir) => expand_home(&dir),
            None => default_config_dir(),
        };
        dir.map_err(|e| ConfigError::ConfigDirUnavailable(format!("{e:#}")))
    }

    /// Build the configured storage backend.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownStorage`] for an unrecognized backend name
    /// and [`ConfigError::ConfigDirUnavailable`] if the directory cannot be resolved.
    pub fn build(self) -> Result<Arc<dyn ConfigStorage>, ConfigError> {
        let backend = self.storage.as_deref().unwrap_or(LOCAL_STORAGE);
        if backend != LOCAL_STORAGE && backend != LEGACY_LOCAL_STORAGE {
            return Err(ConfigError::UnknownStorage(backend.to_string()));
        }

        let dir = self.resolve_config_dir()?;
        tracing::debug!(backend, dir = %dir.display(), "Using config storage");

        let storage = LocalStorage::new(dir)
            .with_key_source(self.key_source.unwrap_or_default());
        Ok(Arc::new(storage))
    }
}
