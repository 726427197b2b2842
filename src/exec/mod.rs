// src/exec/mod.rs

//! Execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `StepExecutor` that the runtime uses in production, and which tests
//!   can replace with a fake implementation.
//! - [`tool`] runs external tools (Sass, PostCSS, the bundler, the linter)
//!   with `tokio::process`, one-shot or long-lived.

pub mod backend;
pub mod tool;

pub use backend::{ExecutorBackend, StepExecutor};
pub use tool::{
    ProcessToolRunner, ToolExit, ToolInvocation, ToolLine, ToolOutput, ToolProcess, ToolRunner,
};
