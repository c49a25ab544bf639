//! Memoized client factories.
//!
//! Responsibilities:
//! - Apply a config's defaults to a `ClientRequest` and derive its cache key.
//! - Construct one `SqlClient` per distinct key and hand out the same `Arc` afterwards.
//! - Coalesce concurrent first calls for the same key.
//!
//! Does NOT handle:
//! - Loading configuration (see `registry` and `sql_connectors_config`).
//! - Evicting or invalidating clients; entries live as long as the factory.
//!
//! Invariants:
//! - Defaults are applied before keying, so omitted and explicit defaults share an entry.
//! - Failed constructions are never cached; the next call retries from scratch.
//! - Construction for one key never blocks callers asking for a different key.

use std::fmt;
use std::sync::Arc;

use moka::sync::Cache;
use serde_json::Value;
use sql_connectors_config::{ConfigDefaults, CredentialResolver, RawConfig, descriptor};

use crate::client::SqlClient;
use crate::engine::{EngineConstructor, EngineOptions};
use crate::error::{ClientError, Result};

/// Arguments for [`ClientFactory::get_client`]. Unset fields take the config's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientRequest {
    env: Option<String>,
    schema: Option<Option<String>>,
    reflect: Option<bool>,
    options: EngineOptions,
}

impl ClientRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request for environment `env` with every other field defaulted.
    pub fn env(env: impl Into<String>) -> Self {
        Self::new().with_env(env)
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Sets the client's default schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(Some(schema.into()));
        self
    }

    /// Clears the client's default schema, even if the config sets one.
    pub fn without_schema(mut self) -> Self {
        self.schema = Some(None);
        self
    }

    pub fn with_reflect(mut self, reflect: bool) -> Self {
        self.reflect = Some(reflect);
        self
    }

    /// Adds an engine construction option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Fills unset fields from `defaults`.
    fn resolve(self, defaults: &ConfigDefaults) -> (ClientKey, EngineOptions) {
        let key = ClientKey {
            env: self.env.unwrap_or_else(|| defaults.env.clone()),
            schema: self.schema.unwrap_or_else(|| defaults.schema.clone()),
            reflect: self.reflect.unwrap_or(defaults.reflect),
            options: canonical_options(&self.options),
        };
        (key, self.options)
    }
}

/// Memoization key: a fully resolved request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    pub env: String,
    pub schema: Option<String>,
    pub reflect: bool,
    /// Options rendered as JSON with sorted keys.
    pub options: String,
}

fn canonical_options(options: &EngineOptions) -> String {
    // Nested objects are `BTreeMap`-backed as well, so keys are sorted at every level.
    Value::Object(
        options
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
    .to_string()
}

/// Produces and memoizes clients for one configuration.
pub struct ClientFactory {
    config: Arc<RawConfig>,
    defaults: ConfigDefaults,
    constructor: Arc<dyn EngineConstructor>,
    resolver: CredentialResolver,
    clients: Cache<ClientKey, Arc<SqlClient>>,
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("config", &self.config.name())
            .field("defaults", &self.defaults)
            .field("cached_clients", &self.clients.entry_count())
            .finish_non_exhaustive()
    }
}

impl ClientFactory {
    pub fn new(
        config: Arc<RawConfig>,
        defaults: ConfigDefaults,
        constructor: Arc<dyn EngineConstructor>,
        resolver: CredentialResolver,
    ) -> Self {
        let clients = Cache::builder()
            .name(&format!("sql-connectors-{}", config.name()))
            .build();
        Self {
            config,
            defaults,
            constructor,
            resolver,
            clients,
        }
    }

    /// Factory using the defaults declared in `config` itself.
    pub fn from_config(
        config: Arc<RawConfig>,
        constructor: Arc<dyn EngineConstructor>,
        resolver: CredentialResolver,
    ) -> Self {
        let defaults = config.defaults();
        Self::new(config, defaults, constructor, resolver)
    }

    pub fn config(&self) -> &RawConfig {
        &self.config
    }

    pub fn defaults(&self) -> &ConfigDefaults {
        &self.defaults
    }

    /// Environments of the underlying config.
    pub fn available_envs(&self) -> Vec<String> {
        self.config.available_envs()
    }

    /// Returns the client for `request`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from descriptor resolution and engine errors
    /// from construction or probing. Failures are not cached.
    pub fn get_client(&self, request: ClientRequest) -> Result<Arc<SqlClient>> {
        let (key, options) = request.resolve(&self.defaults);

        let mut constructed = false;
        let client = self
            .clients
            .try_get_with(key.clone(), || {
                constructed = true;
                self.construct(&key, &options)
            })
            .map_err(ClientError::from_shared)?;

        if !constructed {
            tracing::debug!(config = self.config.name(), env = %key.env, "Reusing cached client");
        }
        Ok(client)
    }

    /// Client for `env` with the config's default schema, reflect flag and no options.
    pub fn get(&self, env: &str) -> Result<Arc<SqlClient>> {
        self.get_client(ClientRequest::env(env))
    }

    /// Client for the config's default environment.
    pub fn get_default(&self) -> Result<Arc<SqlClient>> {
        self.get_client(ClientRequest::new())
    }

    /// Number of clients currently memoized.
    pub fn cached_clients(&self) -> u64 {
        self.clients.run_pending_tasks();
        self.clients.entry_count()
    }

    fn construct(&self, key: &ClientKey, options: &EngineOptions) -> Result<Arc<SqlClient>> {
        let config = self.config.name();

        let descriptor = descriptor::build(&self.config, &key.env, &self.resolver)?;
        let engine = self.constructor.construct(&descriptor, options)?;
        let client = SqlClient::connect(engine, descriptor, key.schema.clone(), key.reflect)?;

        tracing::info!(
            config,
            env = %key.env,
            schema = ?key.schema,
            reflect = key.reflect,
            url = %client.descriptor(),
            "Created client"
        );
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ConfigDefaults {
        ConfigDefaults {
            env: "dev".to_string(),
            schema: Some("mart".to_string()),
            reflect: false,
        }
    }

    #[test]
    fn test_empty_request_resolves_to_defaults() {
        let (key, options) = ClientRequest::new().resolve(&defaults());

        assert_eq!(key.env, "dev");
        assert_eq!(key.schema.as_deref(), Some("mart"));
        assert!(!key.reflect);
        assert_eq!(key.options, "{}");
        assert!(options.is_empty());
    }

    #[test]
    fn test_explicit_defaults_share_key() {
        let (implicit, _) = ClientRequest::new().resolve(&defaults());
        let (explicit, _) = ClientRequest::env("dev")
            .with_schema("mart")
            .with_reflect(false)
            .resolve(&defaults());

        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_without_schema_overrides_default() {
        let (key, _) = ClientRequest::new().without_schema().resolve(&defaults());
        assert!(key.schema.is_none());
    }

    #[test]
    fn test_option_order_does_not_matter() {
        let (a, _) = ClientRequest::new()
            .with_option("pool_size", 5)
            .with_option("connect_args", json!({"timeout": 3, "sslmode": "require"}))
            .resolve(&defaults());
        let (b, _) = ClientRequest::new()
            .with_option("connect_args", json!({"sslmode": "require", "timeout": 3}))
            .with_option("pool_size", 5)
            .resolve(&defaults());

        assert_eq!(a, b);
        assert_eq!(
            a.options,
            r#"{"connect_args":{"sslmode":"require","timeout":3},"pool_size":5}"#
        );
    }

    #[test]
    fn test_different_options_different_keys() {
        let (a, _) = ClientRequest::new().with_option("echo", true).resolve(&defaults());
        let (b, _) = ClientRequest::new().with_option("echo", false).resolve(&defaults());
        assert_ne!(a, b);
    }
}
