// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{PipelineConfig, RawPipelineConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw config.
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON. This
/// only performs deserialization; use [`load_and_validate`] for semantic
/// checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPipelineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let config: RawPipelineConfig = if is_toml {
        toml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads JSON or TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks glob syntax, tool programs, server port and queue settings.
/// - Anchors relative paths at the config file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let raw_config = load_from_path(&path)?;
    let config = PipelineConfig::try_from(raw_config)?;
    Ok(config.with_project_dir(config_root_dir(path.as_ref())))
}

/// Default config path: `config.json` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.json")
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "site/config.json"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current working
///   directory.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
