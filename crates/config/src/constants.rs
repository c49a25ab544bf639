//! Centralized constants for the SQL connectors workspace.
//!
//! This module contains environment variable names, reserved configuration
//! keys, and default values shared by the loader, the descriptor builder,
//! and the client factory.

// =============================================================================
// Environment Variables
// =============================================================================

/// Overrides the directory searched for configuration files.
pub const ENV_CONFIG_DIR: &str = "SQL_CONNECTORS_CONFIG_DIR";

/// Selects the configuration storage backend.
pub const ENV_STORAGE: &str = "SQL_CONNECTORS_STORAGE";

/// Location handed to the configuration storage backend.
pub const ENV_PATH_OR_URI: &str = "SQL_CONNECTORS_PATH_OR_URI";

/// Hex-encoded 32-byte key used to decrypt encrypted configuration values.
pub const ENV_MASTER_KEY: &str = "SQL_CONNECTORS_MASTER_KEY";

/// Log filter directive read by the client crate's logging setup.
pub const ENV_LOG: &str = "SQL_CONNECTORS_LOG";

/// Disables `.env` loading when set to `1` or `true`.
pub const ENV_DOTENV_DISABLED: &str = "DOTENV_DISABLED";

// =============================================================================
// Storage Defaults
// =============================================================================

/// Default configuration directory; `~` is expanded to the home directory.
pub const DEFAULT_CONFIG_DIR: &str = "~/.config/sql_connectors";

/// Extension of configuration files inside the config directory.
pub const CONFIG_EXTENSION: &str = "json";

/// Name of the built-in directory-backed storage.
pub const LOCAL_STORAGE: &str = "local";

/// Historical fully-qualified name of the directory-backed storage, still
/// accepted in `SQL_CONNECTORS_STORAGE`.
pub const LEGACY_LOCAL_STORAGE: &str = "sql_connectors.storage.LocalStorage";

// =============================================================================
// Config Keys
// =============================================================================

pub const KEY_DRIVERNAME: &str = "drivername";
pub const KEY_RELATIVE_PATHS: &str = "relative_paths";
pub const KEY_ALLOWED_HOSTS: &str = "allowed_hosts";
pub const KEY_DEFAULT_ENV: &str = "default_env";
pub const KEY_DEFAULT_SCHEMA: &str = "default_schema";
pub const KEY_DEFAULT_REFLECT: &str = "default_reflect";

/// Top-level keys that are never environment names.
pub const RESERVED_KEYS: [&str; 6] = [
    KEY_DRIVERNAME,
    KEY_RELATIVE_PATHS,
    KEY_ALLOWED_HOSTS,
    KEY_DEFAULT_ENV,
    KEY_DEFAULT_SCHEMA,
    KEY_DEFAULT_REFLECT,
];

/// Environment used when a config does not name a `default_env`.
pub const DEFAULT_ENV: &str = "default";

/// Substrings of `drivername` identifying embedded, credential-less backends.
pub const CREDENTIAL_LESS_DRIVERS: &[&str] = &["sqlite"];

// =============================================================================
// Encryption
// =============================================================================

/// Prefix marking an encrypted string value in a configuration file.
pub const ENCRYPTED_VALUE_PREFIX: &str = "enc:";

/// Keyring account holding the hex-encoded master key.
pub const KEYRING_MASTER_KEY_ACCOUNT: &str = "encryption-master-key";
