// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning steps
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production executor in [`StepExecutor`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::errors::Result;
use crate::steps::{StepContext, run_step};

/// Trait abstracting how scheduled tasks are executed.
///
/// Production code uses [`StepExecutor`]; tests can provide their own
/// implementation that doesn't touch the filesystem or spawn processes.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// Implementations must eventually report a `TaskCompleted` event for
    /// every task they accept.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs each scheduled task's build step on its own tokio task and reports
/// the outcome back to the runtime.
pub struct StepExecutor {
    ctx: Arc<StepContext>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
}

impl StepExecutor {
    pub fn new(ctx: Arc<StepContext>, runtime_tx: mpsc::Sender<RuntimeEvent>) -> Self {
        Self { ctx, runtime_tx }
    }
}

impl ExecutorBackend for StepExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                let ctx = Arc::clone(&self.ctx);
                let tx = self.runtime_tx.clone();
                tokio::spawn(async move {
                    let outcome = run_step(&ctx, &task).await;
                    log_outcome(&task, &outcome);
                    let event = RuntimeEvent::TaskCompleted {
                        task: task.name.clone(),
                        outcome,
                    };
                    if tx.send(event).await.is_err() {
                        debug!(task = %task.name, "runtime gone; dropping completion");
                    }
                });
            }
            Ok(())
        })
    }
}

fn log_outcome(task: &ScheduledTask, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Success => {
            info!(task = %task.name, run_id = task.run_id, "task finished");
        }
        TaskOutcome::Failed(msg) => {
            error!(task = %task.name, run_id = task.run_id, error = %msg, "task failed");
        }
        TaskOutcome::Fatal(msg) => {
            error!(task = %task.name, run_id = task.run_id, error = %msg, "task failed fatally");
        }
    }
}
