// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::queue::TriggerQueue;
use crate::engine::{TaskName, TaskOutcome, TriggerReason};
use crate::types::{SessionMode, SessionPhase};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The initial build of a watching entry point finished; from now on
    /// failures are reported instead of aborting.
    EnterLivePhase,
    /// The entry point completed and does not keep watching.
    RequestExit,
    /// Stop the session with an error.
    Abort {
        task: TaskName,
        message: String,
        fatal: bool,
    },
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn stopping(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Session-level state the handlers need besides the scheduler and queue.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Entry point the session was started for.
    pub target: TaskName,
    /// Whether reaching the entry point flips the session to the live phase
    /// instead of exiting.
    pub continues_watching: bool,
    pub mode: SessionMode,
}

/// Handle a task trigger event.
///
/// - If the scheduler is idle, start a new run seeded with this trigger plus
///   the oldest queued follow-up batch.
/// - If a run is active:
///   - a task already participating in this run is recorded in the queue
///     for a follow-up run.
///   - a task *not* in the current run is merged into it immediately.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    if scheduler.is_idle() {
        let queued: Vec<(TaskName, TriggerReason)> = queue
            .next_batch()
            .into_iter()
            .filter(|name| *name != task)
            .map(|name| (name, TriggerReason::FileWatch))
            .collect();

        let mut triggers = vec![(task, reason)];
        triggers.extend(queued);
        return CoreStep::running(start_new_run_from_triggers(scheduler, triggers));
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            warn!(task = %task, "trigger for task outside the compiled plan; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let newly_ready = trigger(scheduler, &task, reason);
            if !newly_ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(newly_ready));
            }
        }
        Some(_already_in_run) => {
            queue.record_trigger(&task);
        }
    }

    CoreStep::running(commands)
}

/// Handle a task completion event.
///
/// Failures abort the session during the initial phase. Fatal outcomes
/// abort in any phase. When the run that reached the entry point finishes,
/// a watching session enters the live phase and everything else exits.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    session: &mut SessionState,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    match &outcome {
        TaskOutcome::Fatal(message) => {
            return CoreStep::stopping(vec![CoreCommand::Abort {
                task,
                message: message.clone(),
                fatal: true,
            }]);
        }
        TaskOutcome::Failed(message) if session.mode.failures_are_fatal() => {
            return CoreStep::stopping(vec![CoreCommand::Abort {
                task,
                message: message.clone(),
                fatal: false,
            }]);
        }
        TaskOutcome::Failed(message) => {
            warn!(task = %task, error = %message, "task failed; still watching");
        }
        TaskOutcome::Success => {}
    }

    let step = scheduler.step_completion(&task, &outcome);
    let mut commands = Vec::new();
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if !step.run_just_finished {
        return CoreStep::running(commands);
    }

    if session.mode.phase == SessionPhase::Initial {
        let reached = matches!(
            scheduler.run_state_of(&session.target),
            Some(TaskRunState::DoneSuccess)
        );
        if !reached {
            commands.push(CoreCommand::Abort {
                task: session.target.clone(),
                message: "entry point did not complete".to_string(),
                fatal: false,
            });
            return CoreStep::stopping(commands);
        }

        if !session.continues_watching {
            info!(target = %session.target, "entry point complete");
            commands.push(CoreCommand::RequestExit);
            return CoreStep::stopping(commands);
        }

        session.mode.phase = SessionPhase::Live;
        commands.push(CoreCommand::EnterLivePhase);
    }

    commands.extend(maybe_start_queued_run(scheduler, queue));
    CoreStep::running(commands)
}

/// Seed a fresh run from a set of triggers.
///
/// Entry-point triggers pull in their dependency closure; file-watch
/// triggers run only the bound task.
pub fn start_new_run_from_triggers(
    scheduler: &mut Scheduler,
    triggers: Vec<(TaskName, TriggerReason)>,
) -> Vec<CoreCommand> {
    if triggers.is_empty() {
        return Vec::new();
    }

    scheduler.start_new_run();

    let mut seen = BTreeSet::new();
    let mut all_ready = Vec::new();
    for (task, reason) in triggers {
        if !seen.insert(task.clone()) {
            continue;
        }
        all_ready.extend(trigger(scheduler, &task, reason));
    }

    if all_ready.is_empty() {
        Vec::new()
    } else {
        vec![CoreCommand::DispatchTasks(all_ready)]
    }
}

fn trigger(scheduler: &mut Scheduler, task: &str, reason: TriggerReason) -> Vec<ScheduledTask> {
    match reason {
        TriggerReason::EntryPoint => scheduler.trigger_with_dependencies(task),
        TriggerReason::FileWatch | TriggerReason::BundlerPass => scheduler.trigger_only(task),
    }
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }

    let triggers: Vec<(TaskName, TriggerReason)> = queue
        .next_batch()
        .into_iter()
        .map(|name| (name, TriggerReason::FileWatch))
        .collect();

    start_new_run_from_triggers(scheduler, triggers)
}
