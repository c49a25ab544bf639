//! Configuration-driven SQL client factories.
//!
//! This crate turns named connector configurations into memoized client
//! factories. Each factory lazily builds one `SqlClient` per distinct
//! request (environment, schema, reflect flag, engine options) and returns the
//! same shared client for every equal request afterwards. The database engine
//! itself is supplied by the caller through `EngineConstructor`.

pub mod client;
pub mod engine;
pub mod error;
pub mod factory;
pub mod logging;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{SessionGuard, SqlClient};
pub use engine::{
    Column, Engine, EngineConstructor, EngineOptions, Frame, Session, TableMetadata, TableRef,
};
pub use error::{ClientError, EngineError, Result};
pub use factory::{ClientFactory, ClientKey, ClientRequest};
pub use logging::LoggingConfig;
pub use registry::{ConfigRegistry, ConfigSource, FactoryEntry, Registered, RegistryBuilder};

pub use sql_connectors_config as config;
