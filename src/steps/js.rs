// src/steps/js.rs

//! JavaScript: lint, then bundle.
//!
//! `js-build` runs the bundler once. `js-watch` starts it in watch mode and
//! keeps it running: the first finished compilation completes the step, and
//! every later one triggers `js-watch` again, which reports that pass. In
//! both cases lint runs before a bundle result is reported, and a failing
//! lint raises an error notification but never blocks the bundle.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{StepContext, StepOutcome};
use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::exec::tool::{ToolExit, ToolInvocation, ToolLine, ToolProcess};
use crate::types::SessionMode;

pub const LINT_ERROR_MESSAGE: &str = "JavaScript ESLint error.";
pub const BUILD_ERROR_MESSAGE: &str = "JavaScript build error.";
pub const BUILD_DONE_MESSAGE: &str = "JavaScript build completed.";

/// Result of the lint stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub passed: bool,
    pub diagnostics: String,
}

/// What the bundler produced, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleResult {
    Succeeded { output: String },
    /// The bundler ran and reported errors.
    Errored { diagnostics: String },
    /// The bundler died; no further output will come.
    Crashed { reason: String },
}

/// One-shot bundle: lint, then a single bundler run.
pub async fn run(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    lint_and_report(ctx, mode).await;
    bundle(ctx, mode).await
}

pub async fn lint(ctx: &StepContext, mode: SessionMode) -> LintReport {
    let cfg = &ctx.config;
    let invocation = ToolInvocation::from_spec(&cfg.tools.lint, mode.build, cfg.project_dir());

    match ctx.tools.run(invocation).await {
        Ok(out) => LintReport {
            passed: out.is_success(),
            diagnostics: if out.is_success() {
                String::new()
            } else {
                out.diagnostics()
            },
        },
        Err(err) => LintReport {
            passed: false,
            diagnostics: format!("{err:#}"),
        },
    }
}

async fn lint_and_report(ctx: &StepContext, mode: SessionMode) {
    let report = lint(ctx, mode).await;
    if !report.passed {
        warn!(diagnostics = %report.diagnostics, "lint reported problems");
        ctx.notify_error(LINT_ERROR_MESSAGE);
    }
}

/// Run the bundler once and classify the result.
pub async fn bundle(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    let cfg = &ctx.config;
    let invocation = ToolInvocation::from_spec(&cfg.tools.bundler, mode.build, cfg.project_dir());

    let out = match ctx.tools.run(invocation).await {
        Ok(out) => out,
        Err(err) => return cannot_start(err),
    };

    let result = match out.exit {
        ToolExit::Code(0) => BundleResult::Succeeded { output: out.stdout },
        ToolExit::Signalled => BundleResult::Crashed {
            reason: "bundler terminated by signal".to_string(),
        },
        ToolExit::Code(code) => {
            debug!(code, "bundler exited with errors");
            BundleResult::Errored {
                diagnostics: out.diagnostics(),
            }
        }
    };
    classify(ctx, mode, result)
}

/// Turn a bundle result into an outcome, notifying and reloading on the way.
///
/// - crashed: fatal in every phase.
/// - errored: failed; notified when notifications are enabled.
/// - succeeded: completion notification and page reload when live.
pub fn classify(ctx: &StepContext, mode: SessionMode, result: BundleResult) -> StepOutcome {
    match result {
        BundleResult::Succeeded { output } => {
            if !output.trim().is_empty() {
                info!("[bundler] {}", output.trim_end());
            }
            ctx.notify_info(mode, BUILD_DONE_MESSAGE);
            ctx.reload_page(mode);
            StepOutcome::Success
        }
        BundleResult::Errored { diagnostics } => {
            warn!(%diagnostics, "bundle has errors");
            if mode.notifications_enabled() {
                ctx.notify_error(BUILD_ERROR_MESSAGE);
            }
            StepOutcome::Failed(format!("{BUILD_ERROR_MESSAGE}\n{diagnostics}"))
        }
        BundleResult::Crashed { reason } => {
            error!(%reason, "bundler stopped");
            StepOutcome::Fatal(reason)
        }
    }
}

fn cannot_start(err: anyhow::Error) -> StepOutcome {
    error!(error = %format!("{err:#}"), "bundler could not be started");
    StepOutcome::Fatal(format!("bundler could not be started: {err:#}"))
}

/// One finished compilation of the watching bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundlePass {
    Compiled { failed: bool, output: String },
    Exited { exit: ToolExit, output: String },
}

impl From<BundlePass> for BundleResult {
    fn from(pass: BundlePass) -> Self {
        match pass {
            BundlePass::Compiled {
                failed: false,
                output,
            } => BundleResult::Succeeded { output },
            BundlePass::Compiled {
                failed: true,
                output,
            } => BundleResult::Errored {
                diagnostics: output,
            },
            BundlePass::Exited { exit, output } => {
                let status = match exit {
                    ToolExit::Code(code) => format!("status {code}"),
                    ToolExit::Signalled => "a signal".to_string(),
                };
                let mut reason = format!("bundler watch process exited with {status}");
                if !output.trim().is_empty() {
                    reason.push('\n');
                    reason.push_str(output.trim_end());
                }
                BundleResult::Crashed { reason }
            }
        }
    }
}

/// The bundler running in watch mode, plus the passes it has finished that
/// no `js-watch` run has reported yet.
pub struct BundlerSession {
    passes: Mutex<mpsc::UnboundedReceiver<BundlePass>>,
    reader: JoinHandle<()>,
}

impl fmt::Debug for BundlerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundlerSession").finish_non_exhaustive()
    }
}

impl Drop for BundlerSession {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl BundlerSession {
    async fn next_pass(&self) -> Option<BundlePass> {
        self.passes.lock().await.recv().await
    }

    /// Most recent unreported pass; earlier ones are superseded.
    async fn latest_pass(&self) -> Option<BundlePass> {
        let mut passes = self.passes.lock().await;
        let mut latest = None;
        while let Ok(pass) = passes.try_recv() {
            latest = Some(pass);
        }
        latest
    }
}

struct PassMatcher {
    pass_end: Regex,
    error: Regex,
}

/// Watch-mode bundle for `task`.
///
/// The first run starts the bundler and waits for its first pass. Later
/// runs report the newest pass finished since the previous report, or do
/// nothing if there is none.
pub async fn run_watch(ctx: &StepContext, mode: SessionMode, task: &str) -> StepOutcome {
    let (session, started) = match ctx.bundler_session() {
        Some(session) => (session, false),
        None => match start_watch(ctx, mode, task).await {
            Ok(session) => (session, true),
            Err(err) => return cannot_start(err),
        },
    };

    let pass = if started {
        session.next_pass().await
    } else {
        session.latest_pass().await
    };

    let Some(pass) = pass else {
        if started {
            return StepOutcome::Fatal("bundler stopped before finishing a pass".to_string());
        }
        debug!(task, "no new bundle pass to report");
        return StepOutcome::Success;
    };

    lint_and_report(ctx, mode).await;
    classify(ctx, mode, pass.into())
}

async fn start_watch(ctx: &StepContext, mode: SessionMode, task: &str) -> Result<Arc<BundlerSession>> {
    let cfg = &ctx.config;
    let watch = &cfg.tools.bundler_watch;
    let matcher = PassMatcher {
        pass_end: Regex::new(&watch.pass_pattern).context("compiling bundler pass pattern")?,
        error: Regex::new(&watch.error_pattern).context("compiling bundler error pattern")?,
    };

    let invocation = watch.args.iter().fold(
        ToolInvocation::from_spec(&cfg.tools.bundler, mode.build, cfg.project_dir()),
        |invocation, arg| invocation.arg(arg.clone()),
    );
    let process = ctx.tools.spawn(invocation).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_passes(
        process,
        matcher,
        tx,
        ctx.runtime_tx.clone(),
        task.to_string(),
    ));

    let session = Arc::new(BundlerSession {
        passes: Mutex::new(rx),
        reader,
    });
    ctx.services_guard().bundler = Some(Arc::clone(&session));
    info!(task, "bundler watching");
    Ok(session)
}

/// Split the bundler's output into passes. Every pass after the first
/// triggers `task` so it gets reported.
async fn read_passes(
    mut process: ToolProcess,
    matcher: PassMatcher,
    passes: mpsc::UnboundedSender<BundlePass>,
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    task: TaskName,
) {
    let mut output: Vec<String> = Vec::new();
    let mut finished = 0usize;

    while let Some(line) = process.next_line().await {
        let pass = match line {
            ToolLine::Exited(exit) => BundlePass::Exited {
                exit,
                output: output.join("\n"),
            },
            ToolLine::Stdout(text) | ToolLine::Stderr(text) => {
                debug!("[bundler] {text}");
                let ends = matcher.pass_end.is_match(&text);
                let failed = ends && matcher.error.is_match(&text);
                output.push(text);
                if !ends {
                    continue;
                }
                BundlePass::Compiled {
                    failed,
                    output: std::mem::take(&mut output).join("\n"),
                }
            }
        };

        let exited = matches!(pass, BundlePass::Exited { .. });
        if passes.send(pass).is_err() {
            return;
        }
        finished += 1;

        if finished > 1 {
            if let Some(tx) = &runtime_tx {
                let event = RuntimeEvent::TaskTriggered {
                    task: task.clone(),
                    reason: TriggerReason::BundlerPass,
                };
                if tx.send(event).await.is_err() {
                    debug!("runtime gone; stopping bundler reader");
                    return;
                }
            }
        }
        if exited {
            return;
        }
    }
}
