//! Configuration storage backends.
//!
//! Responsibilities:
//! - Define the `ConfigStorage` seam used to enumerate and fetch configs.
//! - Implement the directory-backed `LocalStorage` over `*.json` files.
//! - Decrypt `enc:`-prefixed values after parsing.
//!
//! Does NOT handle:
//! - Choosing which backend or directory to use (see builder.rs).
//! - Resolving environments or credentials (see `descriptor`).
//!
//! Invariants:
//! - `discover` never recurses into subdirectories.
//! - `load` never reads outside `base_dir`.
//! - A missing file is `NotFound`; malformed JSON is `ParseError` with the parser message.
//! - The storage base directory is absolute, so expanded relative paths are absolute.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use super::error::ConfigError;
use crate::constants::CONFIG_EXTENSION;
use crate::encryption::{MasterKeySource, contains_encrypted, decrypt_tree};
use crate::types::RawConfig;

/// A source of named connector configurations.
pub trait ConfigStorage: fmt::Debug + Send + Sync {
    /// Directory that relative paths inside configs are resolved against.
    fn base_dir(&self) -> &Path;

    /// Names of all configurations available in this storage.
    fn discover(&self) -> Result<Vec<String>, ConfigError>;

    /// Loads and validates the configuration called `name`.
    fn load(&self, name: &str) -> Result<RawConfig, ConfigError>;
}

/// Storage reading `<name>.json` files from a single directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
    key_source: MasterKeySource,
}

impl LocalStorage {
    /// Creates a storage over `base_dir`, made absolute against the working directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = std::path::absolute(&base_dir).unwrap_or(base_dir);
        Self {
            base_dir,
            key_source: MasterKeySource::default(),
        }
    }

    /// Sets where the key for encrypted values comes from.
    pub fn with_key_source(mut self, key_source: MasterKeySource) -> Self {
        self.key_source = key_source;
        self
    }

    /// Path of config `name`, which must be a plain file stem inside `base_dir`.
    fn config_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let is_plain = !name.is_empty()
            && !name.contains(['/', '\\'])
            && matches!(
                Path::new(name).components().collect::<Vec<_>>().as_slice(),
                [Component::Normal(_)]
            );
        if !is_plain {
            return Err(ConfigError::invalid(
                name,
                "<name>",
                "config names cannot contain path separators or '..'",
            ));
        }
        Ok(self.base_dir.join(format!("{name}.{CONFIG_EXTENSION}")))
    }

    fn read_json(&self, path: &Path) -> Result<Value, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Io(e),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl ConfigStorage for LocalStorage {
    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn discover(&self) -> Result<Vec<String>, ConfigError> {
        if !self.base_dir.is_dir() {
            return Err(ConfigError::NotFound {
                path: self.base_dir.clone(),
            });
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let is_config = path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext == CONFIG_EXTENSION);
            if !is_config {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }

        tracing::debug!(dir = %self.base_dir.display(), count = names.len(), "Discovered configs");
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<RawConfig, ConfigError> {
        let path = self.config_path(name)?;
        let mut value = self.read_json(&path)?;

        if contains_encrypted(&value) {
            let key = self
                .key_source
                .resolve()
                .map_err(|e| ConfigError::Decryption(e.to_string()))?;
            decrypt_tree(&mut value, &key).map_err(|e| ConfigError::Decryption(e.to_string()))?;
        }

        tracing::debug!(config = name, path = %path.display(), "Loaded config");
        RawConfig::from_value(name, &self.base_dir, value)
    }
}

/// Lists configuration names in `base_dir` (see [`LocalStorage::discover`]).
pub fn discover(base_dir: &Path) -> Result<Vec<String>, ConfigError> {
    LocalStorage::new(base_dir).discover()
}

/// Loads `base_dir/<name>.json` (see [`LocalStorage::load`]).
pub fn load(name: &str, base_dir: &Path) -> Result<RawConfig, ConfigError> {
    LocalStorage::new(base_dir).load(name)
}
