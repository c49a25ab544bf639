//! Logging initialization.
//!
//! Installs a `tracing-subscriber` fmt layer filtered by `SQL_CONNECTORS_LOG`
//! (default `warn`). Library code only emits `tracing` events; applications
//! opt in to printing them by calling [`LoggingConfig::init`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use sql_connectors_client::logging::LoggingConfig;
//!
//! LoggingConfig::new().with_filter("sql_connectors_client=debug").init()?;
//! ```

use sql_connectors_config::constants::ENV_LOG;
use sql_connectors_config::env_var_or_none;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither the builder nor `SQL_CONNECTORS_LOG` sets one.
pub const DEFAULT_FILTER: &str = "warn";

/// Configuration for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `sql_connectors_client=debug`.
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Include the event target (module path) in each line.
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: env_var_or_none(ENV_LOG).unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            json: false,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Builder method to switch to JSON output.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Builder method to control target output.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    /// Parses the filter directive.
    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.filter)
            .map_err(|e| LoggingError::InvalidFilter(format!("{}: {e}", self.filter)))
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if the filter is invalid or a global subscriber is
    /// already installed.
    pub fn init(&self) -> Result<(), LoggingError> {
        let env_filter = self.env_filter()?;
        let registry = tracing_subscriber::registry().with(env_filter);

        let result = if self.json {
            registry
                .with(fmt::layer().json().with_target(self.with_target))
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(self.with_target))
                .try_init()
        };

        result.map_err(|e| LoggingError::InitError(e.to_string()))
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter {0}")]
    InvalidFilter(String),

    #[error("Failed to initialize logging: {0}")]
    InitError(String),
}
