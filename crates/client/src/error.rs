//! Error types for the SQL connectors client.

use std::sync::Arc;

use sql_connectors_config::ConfigError;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors reported by an engine implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not connect or failed its initialization probe.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The engine does not support the descriptor's driver.
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    /// Table metadata could not be found.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A query or statement failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A session operation (commit, rollback, close) failed.
    #[error("Session error: {0}")]
    Session(String),
}

/// Errors that can occur while building registries or obtaining clients.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration loading or resolution failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine failed to construct, probe, reflect or execute.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No configuration is registered under this name.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// Client construction failed while another caller was waiting for the same key.
    #[error(transparent)]
    Shared(Arc<ClientError>),
}

impl ClientError {
    /// Unwraps an error produced by a coalesced cache initialization.
    ///
    /// The caller that ran the initializer usually holds the only reference and
    /// gets the original error back; concurrent waiters get [`ClientError::Shared`].
    pub(crate) fn from_shared(err: Arc<ClientError>) -> Self {
        Arc::try_unwrap(err).unwrap_or_else(ClientError::Shared)
    }

    /// The underlying error, looking through [`ClientError::Shared`].
    pub fn root(&self) -> &ClientError {
        match self {
            Self::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Check if this error came from configuration resolution.
    pub fn is_config_error(&self) -> bool {
        matches!(self.root(), Self::Config(_))
    }

    /// Check if this error came from the engine.
    pub fn is_engine_error(&self) -> bool {
        matches!(self.root(), Self::Engine(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shared_unwraps_sole_owner() {
        let err = Arc::new(ClientError::UnknownConnection("crm".to_string()));
        let err = ClientError::from_shared(err);
        assert!(matches!(err, ClientError::UnknownConnection(ref name) if name == "crm"));
    }

    #[test]
    fn test_from_shared_keeps_shared_error() {
        let err = Arc::new(ClientError::Engine(EngineError::Connection("refused".into())));
        let _other_waiter = Arc::clone(&err);

        let err = ClientError::from_shared(err);

        assert!(matches!(err, ClientError::Shared(_)));
        assert!(err.is_engine_error());
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err = ClientError::from(ConfigError::MissingDriver("warehouse".to_string()));
        assert!(err.is_config_error());
        assert_eq!(err.to_string(), "Missing drivername in config 'warehouse'");
    }
}
