//! Path helpers for configuration directory locations.
//!
//! Responsibilities:
//! - Expand a leading `~` to the user's home directory.
//! - Provide the documented default configuration directory.
//! - Use `directories` crate for platform-appropriate home lookup.
//!
//! Does NOT handle:
//! - File I/O operations.
//! - Choosing between explicit, environment and default locations (see builder.rs).

use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::constants::DEFAULT_CONFIG_DIR;

/// Returns the current user's home directory.
pub(crate) fn home_dir() -> Result<PathBuf, anyhow::Error> {
    let base_dirs = directories::BaseDirs::new().context("Failed to determine home directory")?;
    Ok(base_dirs.home_dir().to_path_buf())
}

/// Expands a leading `~` component to the home directory.
///
/// Paths without a leading `~` are returned unchanged.
pub(crate) fn expand_home(path: &Path) -> Result<PathBuf, anyhow::Error> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            Ok(home_dir()?.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

/// Returns the default configuration directory:
/// `~/.config/sql_connectors` with `~` expanded.
pub(crate) fn default_config_dir() -> Result<PathBuf, anyhow::Error> {
    expand_home(Path::new(DEFAULT_CONFIG_DIR))
}
