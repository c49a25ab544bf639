//! Configuration resolution for SQL connectors.
//!
//! This crate locates named JSON connector configurations, selects one
//! environment of a configuration and resolves it (relative paths,
//! credentials) into a `ConnectionDescriptor` ready for engine construction.

pub mod constants;
pub mod credentials;
pub mod descriptor;
pub mod encryption;
pub mod keypath;
mod loader;
pub mod types;

pub use credentials::{CredentialField, CredentialResolver, Prompt, TerminalPrompt};
pub use encryption::MasterKeySource;
pub use loader::{
    ConfigError, ConfigStorage, LocalStorage, StorageSettings, discover, env_var_or_none, load,
};
pub use types::{ConfigDefaults, ConnectionDescriptor, RawConfig, SecureValue};
