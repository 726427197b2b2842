// src/logging.rs

//! `tracing` subscriber setup.
//!
//! `--log-level` wins over `ASSETDAG_LOG`, which accepts either a bare level
//! or full `EnvFilter` directives such as `assetdag::watch=debug`. Without
//! either, `info` is used. Output goes to stderr so tool output and the
//! dry-run plan stay alone on stdout.

use anyhow::{Result, anyhow};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "ASSETDAG_LOG";

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = resolve_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

/// Pick the filter from the CLI flag, then the environment value.
///
/// An environment value that does not parse falls back to `info`.
pub fn resolve_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(Level::from(level).as_str());
    }
    env.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(filter: EnvFilter) -> String {
        filter.to_string().to_lowercase()
    }

    #[test]
    fn cli_flag_beats_environment() {
        assert_eq!(shown(resolve_filter(Some(LogLevel::Warn), Some("trace"))), "warn");
    }

    #[test]
    fn environment_directives_are_kept() {
        let filter = resolve_filter(None, Some("assetdag::watch=debug"));
        assert_eq!(shown(filter), "assetdag::watch=debug");
    }

    #[test]
    fn missing_or_blank_environment_means_info() {
        assert_eq!(shown(resolve_filter(None, None)), "info");
        assert_eq!(shown(resolve_filter(None, Some("  "))), "info");
    }
}
