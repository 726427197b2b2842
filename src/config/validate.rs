// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{PipelineConfig, RawPipelineConfig, ToolSpec};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawPipelineConfig> for PipelineConfig {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawPipelineConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(PipelineConfig::new_unchecked(raw))
    }
}

/// Run every semantic check on a freshly deserialized config.
pub fn validate_raw_config(cfg: &RawPipelineConfig) -> Result<()> {
    validate_paths(cfg)?;
    validate_root_globs(cfg)?;
    validate_vendor_list(cfg)?;
    validate_tools(cfg)?;
    validate_server_and_watch(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawPipelineConfig) -> Result<()> {
    let src = cfg.paths.src.trim();
    let build = cfg.paths.build.trim();

    if src.is_empty() || build.is_empty() {
        return Err(PipelineError::ConfigError(
            "paths.src and paths.build must not be empty".to_string(),
        ));
    }
    if src.trim_end_matches('/') == build.trim_end_matches('/') {
        return Err(PipelineError::ConfigError(format!(
            "paths.build ('{build}') must differ from paths.src"
        )));
    }
    Ok(())
}

fn validate_root_globs(cfg: &RawPipelineConfig) -> Result<()> {
    for pattern in cfg.root.iter() {
        if pattern.trim().is_empty() {
            return Err(PipelineError::ConfigError(
                "`root` contains an empty pattern".to_string(),
            ));
        }
        Glob::new(pattern.trim_start_matches('!')).map_err(|e| {
            PipelineError::ConfigError(format!("invalid `root` glob '{pattern}': {e}"))
        })?;
    }
    Ok(())
}

fn validate_vendor_list(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.css_vendor.iter().any(|p| p.trim().is_empty()) {
        return Err(PipelineError::ConfigError(
            "`cssVendor` contains an empty path".to_string(),
        ));
    }
    Ok(())
}

fn validate_tools(cfg: &RawPipelineConfig) -> Result<()> {
    let tools: [(&str, &ToolSpec); 4] = [
        ("sass", &cfg.tools.sass),
        ("postcss", &cfg.tools.postcss),
        ("bundler", &cfg.tools.bundler),
        ("lint", &cfg.tools.lint),
    ];

    for (name, spec) in tools {
        if spec.program.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "tools.{name}.program must not be empty"
            )));
        }
    }

    let watch = &cfg.tools.bundler_watch;
    for (field, pattern) in [
        ("pass_pattern", &watch.pass_pattern),
        ("error_pattern", &watch.error_pattern),
    ] {
        Regex::new(pattern).map_err(|e| {
            PipelineError::ConfigError(format!("tools.bundler_watch.{field} is not a valid regex: {e}"))
        })?;
    }
    Ok(())
}

fn validate_server_and_watch(cfg: &RawPipelineConfig) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "server.port must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.watch.queue_length == 0 {
        return Err(PipelineError::ConfigError(
            "watch.queue_length must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}
