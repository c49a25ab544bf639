//! Configuration loading for connector configs.
//!
//! Responsibilities:
//! - Locate the configuration directory from builder values, environment variables
//!   and defaults.
//! - Discover and load named JSON configuration files through `ConfigStorage`.
//! - Enforce `DOTENV_DISABLED` gate to prevent accidental dotenv loading in tests.
//!
//! Does NOT handle:
//! - Selecting environments or resolving credentials (see `descriptor`).
//! - Writing configurations back to storage.
//!
//! Invariants / Assumptions:
//! - Builder values take precedence over environment variables.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - Loading never prompts or touches the network.

mod builder;
mod env;
mod error;
mod path;
mod storage;

pub use builder::StorageSettings;
pub use env::env_var_or_none;
pub use error::ConfigError;
pub use storage::{ConfigStorage, LocalStorage, discover, load};

#[cfg(test)]
mod tests;
