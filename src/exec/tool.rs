// src/exec/tool.rs

//! External tool invocation.
//!
//! Sass, the CSS post-processor, the bundler and the linter are opaque
//! processes. Steps describe what to run as a [`ToolInvocation`] and hand it
//! to a [`ToolRunner`]; the production runner spawns it with
//! `tokio::process`, tests substitute a scripted fake.
//!
//! Tools run either to completion ([`ToolRunner::run`]) or as a long-lived
//! child whose output arrives line by line ([`ToolRunner::spawn`]).

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ToolSpec;
use crate::types::BuildMode;

/// One fully-resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Bytes piped to the child's stdin, if any.
    pub stdin: Option<Vec<u8>>,
}

impl ToolInvocation {
    /// Start from a configured tool: its base args plus the mode-specific ones.
    pub fn from_spec(spec: &ToolSpec, mode: BuildMode, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: spec.program.clone(),
            args: spec.args_for(mode),
            cwd: cwd.into(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolExit {
    Code(i32),
    /// Terminated without an exit code (killed by a signal).
    Signalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit: ToolExit,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            exit: ToolExit::Code(0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit: ToolExit::Code(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit == ToolExit::Code(0)
    }

    /// Best human-readable diagnostic: stderr, else stdout, else the exit.
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit {
            ToolExit::Code(code) => format!("exited with status {code}"),
            ToolExit::Signalled => "terminated by signal".to_string(),
        }
    }
}

/// One event from a long-lived tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLine {
    Stdout(String),
    Stderr(String),
    /// Always the last event.
    Exited(ToolExit),
}

/// A running tool. Dropping it stops the process.
pub struct ToolProcess {
    lines: mpsc::UnboundedReceiver<ToolLine>,
    supervisor: Option<JoinHandle<()>>,
}

impl fmt::Debug for ToolProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolProcess").finish_non_exhaustive()
    }
}

impl ToolProcess {
    /// `supervisor` owns the child; it is aborted when the process handle
    /// is dropped.
    pub fn new(lines: mpsc::UnboundedReceiver<ToolLine>, supervisor: Option<JoinHandle<()>>) -> Self {
        Self { lines, supervisor }
    }

    /// Next output line, or `None` once the process is gone.
    pub async fn next_line(&mut self) -> Option<ToolLine> {
        self.lines.recv().await
    }
}

impl Drop for ToolProcess {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
        }
    }
}

/// Runs external tools.
///
/// `Err` means the process could not be started or awaited at all; a
/// process that ran and failed is an `Ok` with a non-zero [`ToolExit`].
pub trait ToolRunner: Send + Sync {
    fn run(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + '_>>;

    /// Start a tool that keeps running, such as a bundler in watch mode.
    fn spawn(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolProcess>> + Send + '_>>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessToolRunner;

impl ToolRunner for ProcessToolRunner {
    fn run(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + '_>> {
        Box::pin(async move { run_process(invocation).await })
    }

    fn spawn(
        &self,
        invocation: ToolInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ToolProcess>> + Send + '_>> {
        Box::pin(async move { spawn_process(invocation) })
    }
}

async fn run_process(invocation: ToolInvocation) -> Result<ToolOutput> {
    info!(cmd = %invocation, "running external tool");

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}'", invocation.program))?;

    if let Some(input) = invocation.stdin {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .await
                .with_context(|| format!("writing stdin of '{}'", invocation.program))?;
            // Dropping closes the pipe so the tool sees EOF.
            drop(stdin);
        }
    }

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{}'", invocation.program))?;

    let exit = match output.status.code() {
        Some(code) => ToolExit::Code(code),
        None => ToolExit::Signalled,
    };
    debug!(program = %invocation.program, ?exit, "external tool exited");

    Ok(ToolOutput {
        exit,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

fn spawn_process(invocation: ToolInvocation) -> Result<ToolProcess> {
    info!(cmd = %invocation, "starting long-running tool");

    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning '{}'", invocation.program))?;

    let stdout = child.stdout.take().context("child stdout was not captured")?;
    let stderr = child.stderr.take().context("child stderr was not captured")?;
    let (tx, rx) = mpsc::unbounded_channel();
    let program = invocation.program;

    let supervisor = tokio::spawn(async move {
        let mut out = BufReader::new(stdout).lines();
        let mut err = BufReader::new(stderr).lines();
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            tokio::select! {
                line = out.next_line(), if out_open => match line {
                    Ok(Some(line)) => {
                        let _ = tx.send(ToolLine::Stdout(line));
                    }
                    _ => out_open = false,
                },
                line = err.next_line(), if err_open => match line {
                    Ok(Some(line)) => {
                        let _ = tx.send(ToolLine::Stderr(line));
                    }
                    _ => err_open = false,
                },
            }
        }

        let exit = match child.wait().await {
            Ok(status) => status.code().map_or(ToolExit::Signalled, ToolExit::Code),
            Err(_) => ToolExit::Signalled,
        };
        debug!(%program, ?exit, "long-running tool exited");
        let _ = tx.send(ToolLine::Exited(exit));
    });

    Ok(ToolProcess::new(rx, Some(supervisor)))
}
