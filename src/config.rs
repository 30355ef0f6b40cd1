// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;
use crate::utils::log;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if loading fails.
pub fn load_config(path: &Path) -> Result<Config> {
    read_toml(path).or_else(|e| {
        log::warn(&format!("failed to load config from {path:?}: {e}"));
        log::warn("using default configuration");
        Ok(Config::default())
    })
}

fn read_toml(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}
