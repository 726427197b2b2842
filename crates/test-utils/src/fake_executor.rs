use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetdag::dag::ScheduledTask;
use assetdag::engine::{RuntimeEvent, TaskOutcome};
use assetdag::errors::Result;
use assetdag::exec::ExecutorBackend;

use tokio::sync::mpsc;

/// A fake executor that:
/// - records every dispatched task (name and session mode)
/// - immediately reports `TaskCompleted` with a scripted outcome, or
///   `Success` when nothing is scripted for that task.
///
/// Scripted outcomes are consumed in order, so a task can fail once and
/// succeed on its next run.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ScheduledTask>>>,
    scripted: HashMap<String, Vec<TaskOutcome>>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<ScheduledTask>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            scripted: HashMap::new(),
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.scripted
            .entry(task.to_string())
            .or_default()
            .push(outcome);
        self
    }

    fn next_outcome(&mut self, task: &str) -> TaskOutcome {
        match self.scripted.get_mut(task) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => TaskOutcome::Success,
        }
    }
}

/// Names of the recorded tasks, in dispatch order.
pub fn executed_names(executed: &Arc<Mutex<Vec<ScheduledTask>>>) -> Vec<String> {
    executed
        .lock()
        .unwrap()
        .iter()
        .map(|t| t.name.clone())
        .collect()
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in tasks {
                let outcome = self.next_outcome(&t.name);
                let name = t.name.clone();
                self.executed.lock().unwrap().push(t);

                self.runtime_tx
                    .send(RuntimeEvent::TaskCompleted {
                        task: name,
                        outcome,
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
