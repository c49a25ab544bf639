//! Registry of client factories, one per named configuration.
//!
//! Responsibilities:
//! - Build an immutable registry from an ordered list of config sources.
//! - Expose each config as `{name}` (its factory) and `{name}_envs` (its environments).
//! - Discover every config in a storage, skipping the ones that fail to load.
//!
//! Does NOT handle:
//! - Constructing clients (see `factory`).
//! - Parsing configuration files (see `sql_connectors_config`).
//!
//! Invariants:
//! - A registry is never mutated after it is built; rebuilding is the only way to add sources.
//! - No two registered keys collide, counting the `{name}_envs` aliases.
//! - Inline sources never touch the disk.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use sql_connectors_config::{
    ConfigError, ConfigStorage, CredentialResolver, RawConfig, StorageSettings,
};

use crate::client::SqlClient;
use crate::engine::EngineConstructor;
use crate::error::{ClientError, Result};
use crate::factory::{ClientFactory, ClientRequest};

/// Suffix of the key under which a config's environments are registered.
pub const ENVS_SUFFIX: &str = "_envs";

/// One configuration to register: a name and, optionally, its contents.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    name: String,
    config: Option<Value>,
}

impl ConfigSource {
    /// A source loaded from storage as `<name>.json`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    /// A source whose contents are supplied directly.
    pub fn inline(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config: Some(config),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A registered configuration: its factory plus environment listing.
#[derive(Debug, Clone)]
pub struct FactoryEntry {
    factory: Arc<ClientFactory>,
}

impl FactoryEntry {
    fn new(
        config: RawConfig,
        constructor: Arc<dyn EngineConstructor>,
        resolver: CredentialResolver,
    ) -> Self {
        let factory = ClientFactory::from_config(Arc::new(config), constructor, resolver);
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn name(&self) -> &str {
        self.factory.config().name()
    }

    pub fn factory(&self) -> &Arc<ClientFactory> {
        &self.factory
    }

    /// See [`ClientFactory::get_client`].
    pub fn get_client(&self, request: ClientRequest) -> Result<Arc<SqlClient>> {
        self.factory.get_client(request)
    }

    /// See [`ClientFactory::get`].
    pub fn get(&self, env: &str) -> Result<Arc<SqlClient>> {
        self.factory.get(env)
    }

    /// See [`ClientFactory::get_default`].
    pub fn get_default(&self) -> Result<Arc<SqlClient>> {
        self.factory.get_default()
    }

    pub fn available_envs(&self) -> Vec<String> {
        self.factory.available_envs()
    }
}

/// What a registry key resolves to.
#[derive(Debug, Clone)]
pub enum Registered<'a> {
    /// `{name}`: the config's factory.
    Factory(&'a FactoryEntry),
    /// `{name}_envs`: the config's environment names.
    Envs(Vec<String>),
}

/// Immutable mapping from config name to its factory.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    entries: BTreeMap<String, FactoryEntry>,
}

impl ConfigRegistry {
    /// Registers every config `storage` can discover.
    ///
    /// Configs that fail to load are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if the storage location does not exist.
    pub fn discover(
        storage: &dyn ConfigStorage,
        constructor: Arc<dyn EngineConstructor>,
        resolver: CredentialResolver,
    ) -> Result<Self> {
        let mut names = storage.discover()?;
        names.sort();

        let mut registry = Keys::default();
        for name in names {
            if let Err(e) = registry.reserve(&name) {
                tracing::warn!(config = %name, error = %e, "Skipping config with a clashing name");
                continue;
            }
            match storage.load(&name) {
                Ok(config) => {
                    let entry = FactoryEntry::new(config, constructor.clone(), resolver.clone());
                    registry.entries.insert(name, entry);
                }
                Err(e) => {
                    registry.release(&name);
                    tracing::warn!(config = %name, error = %e, "Skipping config that failed to load");
                }
            }
        }

        tracing::debug!(count = registry.entries.len(), "Discovered connection configs");
        Ok(Self {
            entries: registry.entries,
        })
    }

    pub fn get(&self, name: &str) -> Option<&FactoryEntry> {
        self.entries.get(name)
    }

    /// Like [`get`](Self::get), failing with [`ClientError::UnknownConnection`].
    pub fn require(&self, name: &str) -> Result<&FactoryEntry> {
        self.get(name)
            .ok_or_else(|| ClientError::UnknownConnection(name.to_string()))
    }

    /// Environments of config `name`.
    pub fn envs(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(FactoryEntry::available_envs)
    }

    /// Resolves a registry key, either `{name}` or `{name}_envs`.
    pub fn lookup(&self, key: &str) -> Option<Registered<'_>> {
        if let Some(entry) = self.get(key) {
            return Some(Registered::Factory(entry));
        }
        let name = key.strip_suffix(ENVS_SUFFIX)?;
        self.envs(name).map(Registered::Envs)
    }

    /// Registered config names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a [`ConfigRegistry`] from explicit sources.
pub struct RegistryBuilder {
    sources: Vec<ConfigSource>,
    storage: Option<Arc<dyn ConfigStorage>>,
    constructor: Arc<dyn EngineConstructor>,
    resolver: Option<CredentialResolver>,
}

impl RegistryBuilder {
    pub fn new(constructor: Arc<dyn EngineConstructor>) -> Self {
        Self {
            sources: Vec::new(),
            storage: None,
            constructor,
            resolver: None,
        }
    }

    /// Storage used for sources without inline contents.
    ///
    /// Defaults to [`StorageSettings`] read from the environment, built on first use.
    pub fn with_storage(mut self, storage: Arc<dyn ConfigStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Credential resolver shared by every factory. Defaults to terminal prompting.
    pub fn with_resolver(mut self, resolver: CredentialResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn sources(mut self, sources: impl IntoIterator<Item = ConfigSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    /// Loads every source and registers its factory.
    ///
    /// Without an explicit storage, the default storage is only built once a
    /// named source needs it. Inline sources resolve relative paths against the
    /// storage base dir, or the configured config dir when there is no storage yet.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateName`] if two sources would share a key, and
    /// any error from loading a source.
    pub fn build(self) -> Result<ConfigRegistry> {
        let resolver = self.resolver.unwrap_or_default();
        let settings = StorageSettings::new().from_env();
        let mut storage = self.storage;
        let mut registry = Keys::default();

        for source in self.sources {
            registry.reserve(&source.name)?;

            let config = match source.config {
                Some(value) => {
                    let base_dir = match &storage {
                        Some(storage) => storage.base_dir().to_path_buf(),
                        None => {
                            let dir = settings.resolve_config_dir()?;
                            std::path::absolute(&dir).unwrap_or(dir)
                        }
                    };
                    RawConfig::from_value(&source.name, base_dir, value)?
                }
                None => {
                    let source_storage = match storage.clone() {
                        Some(storage) => storage,
                        None => {
                            let built = settings.clone().build()?;
                            storage = Some(Arc::clone(&built));
                            built
                        }
                    };
                    source_storage.load(&source.name)?
                }
            };

            let entry = FactoryEntry::new(config, self.constructor.clone(), resolver.clone());
            registry.entries.insert(source.name, entry);
        }

        Ok(ConfigRegistry {
            entries: registry.entries,
        })
    }
}

/// Entries under construction together with every key they claim.
#[derive(Default)]
struct Keys {
    entries: BTreeMap<String, FactoryEntry>,
    claimed: BTreeSet<String>,
}

impl Keys {
    /// Claims `{name}` and `{name}_envs`, failing if either is taken.
    fn reserve(&mut self, name: &str) -> std::result::Result<(), ConfigError> {
        let envs_key = format!("{name}{ENVS_SUFFIX}");
        if self.claimed.contains(name) || self.claimed.contains(&envs_key) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        self.claimed.insert(name.to_string());
        self.claimed.insert(envs_key);
        Ok(())
    }

    /// Gives back the keys claimed for `name` by a successful `reserve`.
    fn release(&mut self, name: &str) {
        self.claimed.remove(name);
        self.claimed.remove(&format!("{name}{ENVS_SUFFIX}"));
    }
}
