// src/errors.rs

use thiserror::Error;

/// Errors that stop a pipeline session.
///
/// Step-level problems (a lint error, a bad JSON fragment) are reported as
/// task outcomes instead and only turn into `TaskFailed` or `FatalTask` when
/// the session decides to abort.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error("unknown task or entry point '{0}'")]
    TaskNotFound(String),

    #[error("task dependencies form a cycle: {0}")]
    DagCycle(String),

    #[error("config file is not valid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("config file is not valid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("task '{task}' failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("task '{task}' failed fatally: {message}")]
    FatalTask { task: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
