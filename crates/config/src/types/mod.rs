//! Configuration type definitions for SQL connectors.
//!
//! Responsibilities:
//! - Define the parsed configuration (`RawConfig`) and its factory defaults.
//! - Define the resolved `ConnectionDescriptor` handed to engine construction.
//! - Define stored credential values (`SecureValue`).
//!
//! Does NOT handle:
//! - Reading configuration from storage (see `loader` module).
//! - Credential prompting and descriptor resolution (see `credentials`, `descriptor`).
//! - Actual database connections (see client crate).
//!
//! Invariants:
//! - All secret types use `secrecy::SecretString` to prevent accidental logging.
//! - `KEYRING_SERVICE` is the canonical service name for all keyring operations.

pub(crate) mod connection;
mod raw;
mod secret;

pub use connection::ConnectionDescriptor;
pub use raw::{ConfigDefaults, RawConfig, is_credential_less_driver, is_reserved};
pub use secret::{KEYRING_SERVICE, SecureValue};
