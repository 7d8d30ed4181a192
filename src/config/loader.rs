// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation or duration parsing. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Parse a TOML string into a validated config.
pub fn parse_str(contents: &str) -> Result<ConfigFile> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Parses `[timing]` durations and checks sizing / timeout sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load `path` if it exists; otherwise fall back to built-in defaults when
/// `optional` is set.
///
/// The front end passes `optional = true` only for the default config path,
/// so an explicitly requested file that is missing is still an error.
pub fn load_or_default(path: impl AsRef<Path>, optional: bool) -> Result<ConfigFile> {
    let path = path.as_ref();
    if optional && !path.exists() {
        debug!(path = ?path, "no config file found; using defaults");
        return Ok(ConfigFile::default());
    }
    load_and_validate(path)
}

/// Default config location: `Slotrunner.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Slotrunner.toml")
}
