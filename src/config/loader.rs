// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawEngineConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawEngineConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks pool sizing and the graph output path.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = EngineConfig::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate configuration held in memory.
pub fn from_toml_str(contents: &str) -> Result<EngineConfig> {
    let raw_config: RawEngineConfig = toml::from_str(contents)?;
    EngineConfig::try_from(raw_config)
}
