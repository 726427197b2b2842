// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::{PipelineError, Result};
use crate::exec::ExecutorBackend;

use super::core::CoreRuntime;
use super::{CoreCommand, RuntimeEvent};

/// Async shell around [`CoreRuntime`].
///
/// Events come in over the channel, the core decides, and this loop carries
/// out the resulting commands against the executor.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
        }
    }

    /// Run until the core stops the session or every sender is gone.
    ///
    /// An aborted session surfaces as a [`PipelineError`].
    pub async fn run(mut self) -> Result<()> {
        info!(mode = %self.core.session_mode().build, "pipeline session started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "event");
            let step = self.core.step(event);
            for command in step.commands {
                self.apply(command).await?;
            }
            if !step.keep_running {
                debug!("session stopped by core");
                return Ok(());
            }
        }

        info!("event channel closed; session over");
        Ok(())
    }

    async fn apply(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.dispatch(tasks).await,
            CoreCommand::EnterLivePhase => {
                info!("initial build finished; watching for changes");
                Ok(())
            }
            CoreCommand::RequestExit => {
                info!("entry point finished");
                Ok(())
            }
            CoreCommand::Abort {
                task,
                message,
                fatal: true,
            } => Err(PipelineError::FatalTask { task, message }),
            CoreCommand::Abort { task, message, .. } => {
                Err(PipelineError::TaskFailed { task, message })
            }
        }
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }
        for task in &tasks {
            debug!(task = %task.name, run_id = task.run_id, session = ?task.session, "dispatching");
        }
        self.executor.spawn_ready_tasks(tasks).await
    }
}
