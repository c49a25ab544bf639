//! Parsed connector configuration.
//!
//! Responsibilities:
//! - Hold one data source's parsed JSON document with its name and base directory.
//! - Validate the types of reserved keys and the shape of environment blocks.
//! - Derive factory defaults and enumerate environment names.
//!
//! Does NOT handle:
//! - Reading files or choosing a storage backend (see `loader`).
//! - Credential prompting or descriptor building (see `credentials`, `descriptor`).
//!
//! Invariants:
//! - A `RawConfig` always wraps a JSON object whose reserved keys have valid types.
//! - Every non-reserved top-level key maps to a JSON object (an environment block).
//! - `available_envs` is computed from this value on every call.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::constants::{
    CREDENTIAL_LESS_DRIVERS, DEFAULT_ENV, KEY_ALLOWED_HOSTS, KEY_DEFAULT_ENV, KEY_DEFAULT_REFLECT,
    KEY_DEFAULT_SCHEMA, KEY_DRIVERNAME, KEY_RELATIVE_PATHS, RESERVED_KEYS,
};
use crate::credentials::host_list;
use crate::loader::ConfigError;

/// Defaults applied by a client factory when a request leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDefaults {
    /// Environment used when none is requested.
    pub env: String,
    /// Default schema for table lookups and reflection.
    pub schema: Option<String>,
    /// Whether to reflect the default schema on construction.
    pub reflect: bool,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            env: DEFAULT_ENV.to_string(),
            schema: None,
            reflect: false,
        }
    }
}

/// One data source's configuration as parsed from JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    name: String,
    base_dir: PathBuf,
    values: Map<String, Value>,
}

impl RawConfig {
    /// Wraps a parsed JSON document, validating reserved keys and environment blocks.
    ///
    /// `base_dir` is the directory relative paths are resolved against.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if the document is not an object,
    /// a reserved key has the wrong type, or an environment is not an object.
    pub fn from_value(
        name: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        value: Value,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let Value::Object(values) = value else {
            return Err(ConfigError::invalid(
                &name,
                "<root>",
                "configuration must be a JSON object",
            ));
        };

        validate(&name, &values)?;

        Ok(Self {
            name,
            base_dir: base_dir.into(),
            values,
        })
    }

    /// Name of the data source (the file stem for disk-backed configs).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory that relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The underlying JSON object.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Backend dialect identifier, if present.
    pub fn drivername(&self) -> Option<&str> {
        self.values.get(KEY_DRIVERNAME).and_then(Value::as_str)
    }

    /// Whether the driver is an embedded backend that needs no credentials.
    pub fn is_credential_less(&self) -> bool {
        self.drivername().is_some_and(is_credential_less_driver)
    }

    /// Dotted key-paths inside environment blocks that hold relative paths.
    pub fn relative_paths(&self) -> Vec<&str> {
        string_array(&self.values, KEY_RELATIVE_PATHS)
    }

    /// Hosts allowed to use stored credentials without prompting.
    pub fn allowed_hosts(&self) -> Vec<&str> {
        string_array(&self.values, KEY_ALLOWED_HOSTS)
    }

    /// Environment block for `env`, if `env` names an environment.
    pub fn environment(&self, env: &str) -> Option<&Map<String, Value>> {
        if is_reserved(env) {
            return None;
        }
        self.values.get(env).and_then(Value::as_object)
    }

    /// Sorted environment names: all top-level keys except the reserved set.
    pub fn available_envs(&self) -> Vec<String> {
        let mut envs: Vec<String> = self
            .values
            .keys()
            .filter(|key| !is_reserved(key))
            .cloned()
            .collect();
        envs.sort();
        envs
    }

    /// Factory defaults, falling back to `default` / no schema / no reflection.
    pub fn defaults(&self) -> ConfigDefaults {
        let fallback = ConfigDefaults::default();
        ConfigDefaults {
            env: self
                .values
                .get(KEY_DEFAULT_ENV)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or(fallback.env),
            schema: self
                .values
                .get(KEY_DEFAULT_SCHEMA)
                .and_then(Value::as_str)
                .map(str::to_string),
            reflect: self
                .values
                .get(KEY_DEFAULT_REFLECT)
                .and_then(Value::as_bool)
                .unwrap_or(fallback.reflect),
        }
    }
}

/// Whether `key` is one of the reserved, non-environment keys.
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Whether `drivername` identifies an embedded backend that needs no credentials.
pub fn is_credential_less_driver(drivername: &str) -> bool {
    CREDENTIAL_LESS_DRIVERS
        .iter()
        .any(|marker| drivername.contains(marker))
}

fn string_array<'a>(values: &'a Map<String, Value>, key: &str) -> Vec<&'a str> {
    values
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn validate(name: &str, values: &Map<String, Value>) -> Result<(), ConfigError> {
    for (key, value) in values {
        match key.as_str() {
            KEY_DRIVERNAME | KEY_DEFAULT_ENV => {
                if !value.is_string() {
                    return Err(ConfigError::invalid(name, key, "expected a string"));
                }
            }
            KEY_DEFAULT_SCHEMA => {
                if !(value.is_string() || value.is_null()) {
                    return Err(ConfigError::invalid(name, key, "expected a string or null"));
                }
            }
            KEY_DEFAULT_REFLECT => {
                if !value.is_boolean() {
                    return Err(ConfigError::invalid(name, key, "expected a boolean"));
                }
            }
            KEY_RELATIVE_PATHS | KEY_ALLOWED_HOSTS => {
                let all_strings = value
                    .as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string));
                if !all_strings {
                    return Err(ConfigError::invalid(
                        name,
                        key,
                        "expected an array of strings",
                    ));
                }
            }
            _ => {
                let Some(block) = value.as_object() else {
                    return Err(ConfigError::invalid(
                        name,
                        key,
                        "environment must be a JSON object",
                    ));
                };
                if let Some(hosts) = block.get(KEY_ALLOWED_HOSTS)
                    && !hosts.is_null()
                    && host_list(hosts).is_none()
                {
                    return Err(ConfigError::invalid(
                        name,
                        &format!("{key}.{KEY_ALLOWED_HOSTS}"),
                        "expected an array of strings",
                    ));
                }
            }
        }
    }
    Ok(())
}
