// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::types::BuildMode;

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Build, watch and serve front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Entry point to run. Defaults to `watch`.
    #[command(subcommand)]
    pub command: Option<EntryCommand>,

    /// Build for production: minified output, no source maps.
    #[arg(long, global = true)]
    pub dist: bool,

    /// Path to the config file (JSON, or TOML when the extension is `.toml`).
    /// Defaults to `config.json` in the current directory.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Override the dev server port from the config file.
    #[arg(long, value_name = "PORT", global = true)]
    pub port: Option<u16>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Validate config, print the execution plan, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

/// Named entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum EntryCommand {
    /// Clean, bundle JavaScript, then build CSS, templates, root files and data.
    Build,
    /// Build once, then watch sources, rebuild on change and serve with live reload.
    Watch,
    /// Build the merged JSON data file only.
    Data,
}

impl EntryCommand {
    /// Name of the pipeline entry point in the task catalog.
    pub fn target(self) -> &'static str {
        match self {
            EntryCommand::Build => "build",
            EntryCommand::Watch => "watch",
            EntryCommand::Data => "data",
        }
    }
}

impl CliArgs {
    pub fn entry(&self) -> EntryCommand {
        self.command.unwrap_or(EntryCommand::Watch)
    }

    pub fn build_mode(&self) -> BuildMode {
        BuildMode::from_dist_flag(self.dist)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(default_config_path)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_watch_with_config_json() {
        let args = CliArgs::try_parse_from(["assetdag"]).unwrap();
        assert_eq!(args.entry(), EntryCommand::Watch);
        assert_eq!(args.config_path(), default_config_path());
        assert_eq!(args.config_path(), PathBuf::from("config.json"));
    }

    #[test]
    fn config_flag_overrides_default_path() {
        let args = CliArgs::try_parse_from(["assetdag", "build", "--dist", "--config", "site/assets.toml"]).unwrap();
        assert_eq!(args.entry(), EntryCommand::Build);
        assert_eq!(args.build_mode(), BuildMode::Production);
        assert_eq!(args.config_path(), PathBuf::from("site/assets.toml"));
    }
}
