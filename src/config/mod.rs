// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate globs, tools and runtime settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{
    BundlerWatchSpec, NotificationsSection, PathsSection, PipelineConfig, RawPipelineConfig, RootGlobs, ServerSection,
    ToolSpec, ToolsSection, WatchSection,
};
pub use validate::validate_raw_config;
