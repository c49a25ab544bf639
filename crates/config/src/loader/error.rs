//! Error types for configuration loading and resolution.
//!
//! Responsibilities:
//! - Define error variants for every failure in loading, validating, and
//!   resolving connector configurations.
//!
//! Does NOT handle:
//! - Engine or client construction failures (see the client crate).
//!
//! Invariants:
//! - All variants carry enough context (config name, path, environment) to
//!   debug without re-running.
//! - No variant ever embeds a credential or raw `.env` line content.
//! - Every variant is non-retryable; callers surface them immediately.

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or resolving a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config source not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Error reading {path}:\n{message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Env '{env}' does not exist in config '{config}'")]
    UnknownEnvironment { config: String, env: String },

    #[error("Missing drivername in config '{0}'")]
    MissingDriver(String),

    #[error("Duplicate config name: {0}")]
    DuplicateName(String),

    #[error("Invalid value for '{key}' in config '{config}': {message}")]
    InvalidConfig {
        config: String,
        key: String,
        message: String,
    },

    #[error("Key path '{path}' cannot be set: segment '{segment}' is missing or not an object")]
    KeyPath { path: String, segment: String },

    #[error("Unknown configuration storage backend: {0}")]
    UnknownStorage(String),

    #[error("Unable to determine config directory: {0}")]
    ConfigDirUnavailable(String),

    #[error("Failed to prompt for {field}: {message}")]
    Prompt { field: String, message: String },

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Failed to decrypt configuration value: {0}")]
    Decryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the `.env` file due to invalid syntax.
    ///
    /// SAFETY: This error only includes the byte index of the parse failure,
    /// NOT the offending line content, to prevent leaking secrets.
    #[error(
        "Failed to parse .env file at position {error_index}. Hint: set DOTENV_DISABLED=1 to skip .env loading"
    )]
    DotenvParse { error_index: usize },

    /// Failed to read the `.env` file due to an I/O error.
    #[error("Failed to read .env file: {kind}")]
    DotenvIo { kind: ErrorKind },

    /// Unknown dotenv error (future variants from dotenvy crate).
    #[error("Failed to load .env file. Hint: set DOTENV_DISABLED=1 to skip .env loading")]
    DotenvUnknown,
}

impl ConfigError {
    pub(crate) fn invalid(config: &str, key: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            config: config.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }
}
