//! Credential resolution for environment blocks.
//!
//! Responsibilities:
//! - Decide per field whether a stored credential may be used or the user must be prompted.
//! - Apply the `allowed_hosts` gate against an injected current hostname.
//! - Normalize empty credentials to "absent".
//!
//! Does NOT handle:
//! - Skipping resolution for embedded backends (the descriptor builder never calls in).
//! - Building descriptors (see `descriptor`).
//!
//! Invariants:
//! - This is the only place in the crate that performs interactive I/O.
//! - An empty credential is never returned as `Some("")`.
//! - Prompt failures are returned to the caller, never swallowed.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::constants::KEY_ALLOWED_HOSTS;
use crate::loader::ConfigError;
use crate::types::SecureValue;

/// A credential field inside an environment block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

impl CredentialField {
    /// Key of this field in an environment block.
    pub fn key(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
        }
    }

    fn prompt_text(self) -> &'static str {
        match self {
            Self::Username => "Username",
            Self::Password => "Password",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Interactive source of credentials.
pub trait Prompt: Send + Sync {
    /// Asks the user for `field`. Passwords should be read with masked input.
    fn ask(&self, field: CredentialField, prompt: &str) -> Result<SecretString, ConfigError>;
}

/// Prompts on the controlling terminal using `dialoguer`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&self, field: CredentialField, prompt: &str) -> Result<SecretString, ConfigError> {
        let to_prompt_error = |e: dialoguer::Error| ConfigError::Prompt {
            field: field.to_string(),
            message: e.to_string(),
        };

        let input = match field {
            CredentialField::Username => dialoguer::Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
                .map_err(to_prompt_error)?,
            CredentialField::Password => dialoguer::Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
                .map_err(to_prompt_error)?,
        };
        Ok(SecretString::new(input.into()))
    }
}

/// Returns this machine's hostname, if it can be determined.
pub fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Resolves usernames and passwords, prompting when stored values may not be used.
#[derive(Clone)]
pub struct CredentialResolver {
    current_hostname: Option<String>,
    prompt: Arc<dyn Prompt>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("current_hostname", &self.current_hostname)
            .finish_non_exhaustive()
    }
}

impl Default for CredentialResolver {
    /// Terminal prompting with the real system hostname.
    fn default() -> Self {
        Self::new(system_hostname(), Arc::new(TerminalPrompt))
    }
}

impl CredentialResolver {
    pub fn new(current_hostname: Option<String>, prompt: Arc<dyn Prompt>) -> Self {
        Self {
            current_hostname,
            prompt,
        }
    }

    /// The hostname checked against `allowed_hosts`.
    pub fn current_hostname(&self) -> Option<&str> {
        self.current_hostname.as_deref()
    }

    /// Resolves `field` for an environment block.
    ///
    /// `allowed_hosts` is the effective allow-list: the block's own
    /// `allowed_hosts` when present, otherwise the config's top-level list
    /// (see [`effective_allowed_hosts`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Prompt`] if prompting fails, [`ConfigError::Keyring`]
    /// if a keyring reference cannot be read, and [`ConfigError::InvalidConfig`]
    /// if the stored value is neither a string nor a keyring reference.
    pub fn resolve_field(
        &self,
        config: &str,
        env_block: &Map<String, Value>,
        field: CredentialField,
        allowed_hosts: &[String],
    ) -> Result<Option<SecretString>, ConfigError> {
        let stored = self.stored_value(config, env_block, field)?;

        let value = match stored {
            Some(value) if self.host_allowed(allowed_hosts) => value,
            _ => {
                tracing::debug!(config, field = %field, "Prompting for credential");
                self.prompt.ask(field, field.prompt_text())?
            }
        };

        if value.expose_secret().is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn host_allowed(&self, allowed_hosts: &[String]) -> bool {
        allowed_hosts.is_empty()
            || self
                .current_hostname
                .as_ref()
                .is_some_and(|host| allowed_hosts.iter().any(|allowed| allowed == host))
    }

    /// Stored, non-empty value of `field`, with keyring references resolved.
    fn stored_value(
        &self,
        config: &str,
        env_block: &Map<String, Value>,
        field: CredentialField,
    ) -> Result<Option<SecretString>, ConfigError> {
        let Some(raw) = env_block.get(field.key()) else {
            return Ok(None);
        };
        if raw.is_null() {
            return Ok(None);
        }

        let secure: SecureValue = serde_json::from_value(raw.clone()).map_err(|_| {
            ConfigError::invalid(
                config,
                field.key(),
                "expected a string or {\"keyring_account\": ...}",
            )
        })?;
        let value = secure.resolve()?;

        if value.expose_secret().is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }
}

/// The allow-list for an environment block: its own `allowed_hosts`, else the config's.
///
/// A `null` entry counts as absent.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidConfig`] if the block's `allowed_hosts` is
/// present but not an array of strings.
pub fn effective_allowed_hosts(
    config: &str,
    env_block: &Map<String, Value>,
    config_hosts: &[&str],
) -> Result<Vec<String>, ConfigError> {
    match env_block.get(KEY_ALLOWED_HOSTS) {
        None | Some(Value::Null) => Ok(config_hosts.iter().map(|host| host.to_string()).collect()),
        Some(value) => host_list(value).ok_or_else(|| {
            ConfigError::invalid(config, KEY_ALLOWED_HOSTS, "expected an array of strings")
        }),
    }
}

/// `value` as a list of host names, or `None` if any entry is not a string.
pub(crate) fn host_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|host| host.as_str().map(str::to_string))
        .collect()
}
