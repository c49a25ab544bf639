//! Connection descriptor resolution.
//!
//! Responsibilities:
//! - Select one environment of a `RawConfig` and inject its `drivername`.
//! - Expand configured relative paths against the config base directory.
//! - Resolve credentials (unless the backend is credential-less) and build the descriptor.
//!
//! Does NOT handle:
//! - Opening connections or constructing engines (see client crate).
//! - Reading configuration from storage (see `loader`).
//!
//! Invariants:
//! - The `RawConfig` is never mutated; every call works on a fresh copy of the block.
//! - Credential-less backends never reach the credential resolver.
//! - `allowed_hosts` is resolution metadata and never reaches the descriptor.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::constants::{KEY_ALLOWED_HOSTS, KEY_DRIVERNAME};
use crate::credentials::{CredentialField, CredentialResolver, effective_allowed_hosts};
use crate::keypath;
use crate::loader::ConfigError;
use crate::types::{ConnectionDescriptor, RawConfig, is_credential_less_driver};

/// Builds the connection descriptor for `env_name` of `raw_config`.
///
/// # Errors
///
/// - [`ConfigError::UnknownEnvironment`] if `env_name` is not an environment of the config.
/// - [`ConfigError::MissingDriver`] if the config has no `drivername`.
/// - [`ConfigError::KeyPath`] if a relative path cannot be rewritten.
/// - Credential resolution errors (prompt, keyring) and [`ConfigError::InvalidConfig`].
pub fn build(
    raw_config: &RawConfig,
    env_name: &str,
    resolver: &CredentialResolver,
) -> Result<ConnectionDescriptor, ConfigError> {
    let config = raw_config.name();

    // (1) copy the environment block
    let mut block = raw_config
        .environment(env_name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownEnvironment {
            config: config.to_string(),
            env: env_name.to_string(),
        })?;

    // (2) inject drivername
    let drivername = raw_config
        .drivername()
        .ok_or_else(|| ConfigError::MissingDriver(config.to_string()))?
        .to_string();
    block.insert(KEY_DRIVERNAME.to_string(), Value::String(drivername.clone()));

    // (3) relative paths
    for rel_path in raw_config.relative_paths() {
        expand_relative_path(&mut block, rel_path, raw_config.base_dir())?;
    }

    // (4) credentials
    let allowed_hosts = effective_allowed_hosts(config, &block, &raw_config.allowed_hosts())?;
    block.remove(KEY_ALLOWED_HOSTS);

    let (username, password) = if is_credential_less_driver(&drivername) {
        // Stored values pass through untouched; nothing is prompted.
        let username = stored_string(&block, CredentialField::Username);
        let password = stored_string(&block, CredentialField::Password)
            .map(|password| SecretString::new(password.into()));
        (username, password)
    } else {
        let username = resolver
            .resolve_field(config, &block, CredentialField::Username, &allowed_hosts)?
            .map(|secret| secret.expose_secret().to_string());
        let password =
            resolver.resolve_field(config, &block, CredentialField::Password, &allowed_hosts)?;
        (username, password)
    };

    let descriptor = ConnectionDescriptor::from_block(config, &block, username, password)?;
    tracing::debug!(config, env = env_name, url = %descriptor, "Resolved connection descriptor");
    Ok(descriptor)
}

fn stored_string(block: &Map<String, Value>, field: CredentialField) -> Option<String> {
    block
        .get(field.key())
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Rewrites the value at `rel_path` into an absolute path under `base_dir`.
///
/// Paths absent from the block are skipped; absolute paths are kept as-is.
fn expand_relative_path(
    block: &mut Map<String, Value>,
    rel_path: &str,
    base_dir: &Path,
) -> Result<(), ConfigError> {
    let Some(sub_path) = keypath::get(block, rel_path).and_then(Value::as_str) else {
        return Ok(());
    };

    let full_path = base_dir.join(sub_path);
    keypath::set(
        block,
        rel_path,
        Value::String(full_path.to_string_lossy().into_owned()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Prompt;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prompt that answers with a fixed value and counts invocations.
    struct CountingPrompt {
        answer: &'static str,
        calls: AtomicUsize,
    }

    impl CountingPrompt {
        fn answering(answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Prompt for CountingPrompt {
        fn ask(
            &self,
            _field: CredentialField,
            _prompt: &str,
        ) -> Result<SecretString, ConfigError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SecretString::new(self.answer.to_string().into()))
        }
    }

    fn raw(value: Value) -> RawConfig {
        RawConfig::from_value("warehouse", "/cfg", value).unwrap()
    }

    fn resolver(prompt: Arc<CountingPrompt>) -> CredentialResolver {
        CredentialResolver::new(Some("laptop".to_string()), prompt)
    }

    #[test]
    fn test_relative_path_expanded_against_base_dir() {
        let config = raw(json!({
            "drivername": "sqlite",
            "relative_paths": ["database"],
            "dev": {"database": "data.db"}
        }));

        let descriptor =
            build(&config, "dev", &resolver(CountingPrompt::answering("x"))).unwrap();

        assert_eq!(descriptor.database(), Some("/cfg/data.db"));
        assert_eq!(descriptor.drivername(), "sqlite");
    }

    #[test]
    fn test_nested_relative_path_expanded() {
        let config = raw(json!({
            "drivername": "postgresql",
            "relative_paths": ["query.sslrootcert"],
            "prod": {
                "username": "etl",
                "password": "pw",
                "query": {"sslrootcert": "certs/ca.pem"}
            }
        }));

        let descriptor =
            build(&config, "prod", &resolver(CountingPrompt::answering("x"))).unwrap();

        assert_eq!(
            descriptor.query().get("sslrootcert").map(String::as_str),
            Some("/cfg/certs/ca.pem")
        );
    }

    #[test]
    fn test_absolute_relative_path_kept() {
        let config = raw(json!({
            "drivername": "sqlite",
            "relative_paths": ["database"],
            "dev": {"database": "/data/shared.db"}
        }));

        let descriptor =
            build(&config, "dev", &resolver(CountingPrompt::answering("x"))).unwrap();
        assert_eq!(descriptor.database(), Some("/data/shared.db"));
    }

    #[test]
    fn test_raw_config_untouched_by_build() {
        let config = raw(json!({
            "drivername": "sqlite",
            "relative_paths": ["database"],
            "dev": {"database": "data.db"}
        }));
        let before = config.clone();

        build(&config, "dev", &resolver(CountingPrompt::answering("x"))).unwrap();

        assert_eq!(config, before);
    }

    #[test]
    fn test_unknown_environment() {
        let config = raw(json!({"drivername": "sqlite", "dev": {}, "prod": {}}));

        let err =
            build(&config, "staging", &resolver(CountingPrompt::answering("x"))).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::UnknownEnvironment { ref env, .. } if env == "staging"
        ));
    }

    #[test]
    fn test_reserved_key_is_not_an_environment() {
        let config = raw(json!({"drivername": "sqlite", "dev": {}}));

        let err = build(&config, "drivername", &resolver(CountingPrompt::answering("x")))
            .unwrap_err();

        assert!(matches!(err, ConfigError::UnknownEnvironment { .. }));
    }

    #[test]
    fn test_missing_driver() {
        let config = raw(json!({"dev": {"host": "h"}}));

        let err = build(&config, "dev", &resolver(CountingPrompt::answering("x"))).unwrap_err();

        assert!(matches!(err, ConfigError::MissingDriver(ref name) if name == "warehouse"));
    }

    #[test]
    fn test_file_backend_never_prompts() {
        let prompt = CountingPrompt::answering("x");
        let config = raw(json!({
            "drivername": "sqlite",
            "allowed_hosts": ["elsewhere"],
            "dev": {"database": "data.db"}
        }));

        let descriptor = build(&config, "dev", &resolver(prompt.clone())).unwrap();

        assert_eq!(prompt.calls(), 0);
        assert!(descriptor.username().is_none());
        assert!(descriptor.password().is_none());
    }

    #[test]
    fn test_network_backend_prompts_for_missing_credentials() {
        let prompt = CountingPrompt::answering("typed");
        let config = raw(json!({"drivername": "postgresql", "dev": {"host": "h"}}));

        let descriptor = build(&config, "dev", &resolver(prompt.clone())).unwrap();

        assert_eq!(prompt.calls(), 2);
        assert_eq!(descriptor.username(), Some("typed"));
        assert_eq!(
            descriptor.password().map(|p| p.expose_secret().to_string()),
            Some("typed".to_string())
        );
    }

    #[test]
    fn test_allowed_hosts_dropped_from_descriptor() {
        let config = raw(json!({
            "drivername": "postgresql",
            "prod": {
                "username": "etl",
                "password": "pw",
                "host": "h",
                "allowed_hosts": ["laptop"]
            }
        }));

        let descriptor =
            build(&config, "prod", &resolver(CountingPrompt::answering("x"))).unwrap();

        assert!(!descriptor.query().contains_key("allowed_hosts"));
        assert_eq!(descriptor.render_url(false), "postgresql://etl:pw@h");
    }

    #[test]
    fn test_build_is_idempotent() {
        let config = raw(json!({
            "drivername": "postgresql",
            "relative_paths": ["query.sslrootcert"],
            "prod": {
                "username": "etl",
                "password": "pw",
                "host": "h",
                "port": 5432,
                "query": {"sslrootcert": "ca.pem"}
            }
        }));
        let resolver = resolver(CountingPrompt::answering("x"));

        let first = build(&config, "prod", &resolver).unwrap();
        let second = build(&config, "prod", &resolver).unwrap();

        assert_eq!(first, second);
    }
}
