// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use crate::dag::{PipelinePlan, Scheduler};
use crate::engine::event_handlers::{
    CoreCommand, CoreStep, SessionState, handle_task_completion, handle_task_trigger,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::RuntimeEvent;
use crate::types::{BuildMode, SessionMode, SessionPhase, TriggerWhileRunningBehaviour};

/// Pure core runtime state.
///
/// This owns:
/// - the DAG scheduler
/// - the trigger queue
/// - the session state (entry point, build mode, phase)
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    session: SessionState,
}

impl CoreRuntime {
    pub fn new(
        plan: &PipelinePlan,
        build: BuildMode,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
    ) -> Self {
        Self {
            scheduler: Scheduler::from_plan(plan),
            queue: TriggerQueue::new(behaviour, queue_length),
            session: SessionState {
                target: plan.target().to_string(),
                continues_watching: plan.continues_watching(),
                mode: SessionMode::initial(build),
            },
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn session_mode(&self) -> SessionMode {
        self.session.mode
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.mode.phase
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    ///
    /// Every dispatched task carries the session mode in effect after the
    /// event was handled.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        let mut step = match event {
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &mut self.session,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        };

        let mode = self.session.mode;
        for command in &mut step.commands {
            if let CoreCommand::DispatchTasks(tasks) = command {
                for task in tasks.iter_mut() {
                    task.session = mode;
                }
            }
        }

        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TaskCatalog;
    use crate::engine::{TaskOutcome, TriggerReason};

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn entry(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::EntryPoint,
        }
    }

    fn done(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome,
        }
    }

    #[test]
    fn data_entry_point_runs_single_task_then_exits() {
        let plan = TaskCatalog::standard().compile("data").unwrap();
        let mut core = CoreRuntime::new(
            &plan,
            BuildMode::Development,
            TriggerWhileRunningBehaviour::Queue,
            1,
        );

        let step = core.step(entry("data"));
        assert_eq!(dispatched(&step), vec!["data-build".to_string()]);

        let step = core.step(done("data-build", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["data".to_string()]);

        let step = core.step(done("data", TaskOutcome::Success));
        assert!(!step.keep_running);
        assert!(step.commands.contains(&CoreCommand::RequestExit));
    }

    #[test]
    fn failure_in_initial_phase_aborts() {
        let plan = TaskCatalog::standard().compile("data").unwrap();
        let mut core = CoreRuntime::new(
            &plan,
            BuildMode::Production,
            TriggerWhileRunningBehaviour::Queue,
            1,
        );

        core.step(entry("data"));
        let step = core.step(done("data-build", TaskOutcome::Failed("bad json".into())));

        assert!(!step.keep_running);
        assert!(matches!(
            step.commands.as_slice(),
            [CoreCommand::Abort { fatal: false, .. }]
        ));
    }

    #[test]
    fn dispatched_tasks_carry_session_mode() {
        let plan = TaskCatalog::standard().compile("build").unwrap();
        let mut core = CoreRuntime::new(
            &plan,
            BuildMode::Production,
            TriggerWhileRunningBehaviour::Queue,
            1,
        );

        let step = core.step(entry("build"));
        let CoreCommand::DispatchTasks(tasks) = &step.commands[0] else {
            panic!("expected dispatch, got {:?}", step.commands);
        };
        assert_eq!(tasks[0].name, "clean");
        assert_eq!(
            tasks[0].session,
            SessionMode::new(BuildMode::Production, SessionPhase::Initial)
        );
    }

    #[test]
    fn repeated_live_triggers_yield_one_follow_up_run() {
        use crate::dag::{PipelineDef, Sequence, StepKind, TaskCategory, TaskDef};

        let plan = TaskCatalog::new()
            .with_task(TaskDef::new("css-build", TaskCategory::BuildStep, StepKind::CssBuild))
            .with_pipeline(PipelineDef::new("dev", Sequence::new().then(&["css-build"])).watching())
            .compile("dev")
            .unwrap();
        let mut core = CoreRuntime::new(
            &plan,
            BuildMode::Development,
            TriggerWhileRunningBehaviour::Queue,
            1,
        );

        core.step(entry("dev"));
        core.step(done("css-build", TaskOutcome::Success));
        let step = core.step(done("dev", TaskOutcome::Success));
        assert!(step.commands.contains(&CoreCommand::EnterLivePhase));
        assert_eq!(core.phase(), SessionPhase::Live);

        let changed = || RuntimeEvent::TaskTriggered {
            task: "css-build".to_string(),
            reason: TriggerReason::FileWatch,
        };
        assert_eq!(dispatched(&core.step(changed())), vec!["css-build".to_string()]);
        assert!(dispatched(&core.step(changed())).is_empty());
        assert!(dispatched(&core.step(changed())).is_empty());

        let step = core.step(done("css-build", TaskOutcome::Success));
        assert_eq!(dispatched(&step), vec!["css-build".to_string()]);
        assert!(core.queue_is_empty());

        let step = core.step(done("css-build", TaskOutcome::Failed("syntax".into())));
        assert!(step.keep_running);
        assert!(dispatched(&step).is_empty());
        assert!(core.is_idle());
    }

    fn changed(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskTriggered {
            task: task.to_string(),
            reason: TriggerReason::FileWatch,
        }
    }

    /// Complete every dispatched task successfully until nothing is left.
    fn settle(core: &mut CoreRuntime, first: CoreStep) {
        let mut pending: std::collections::VecDeque<String> = dispatched(&first).into();
        while let Some(task) = pending.pop_front() {
            let step = core.step(done(&task, TaskOutcome::Success));
            pending.extend(dispatched(&step));
        }
    }

    #[test]
    fn live_rebuilds_do_not_wait_for_or_fail_with_the_bundle() {
        let plan = TaskCatalog::standard().compile("watch").unwrap();
        let mut core = CoreRuntime::new(
            &plan,
            BuildMode::Development,
            TriggerWhileRunningBehaviour::Queue,
            1,
        );
        let first = core.step(entry("watch"));
        settle(&mut core, first);
        assert_eq!(core.phase(), SessionPhase::Live);
        assert!(core.is_idle());

        assert_eq!(dispatched(&core.step(changed("js-watch"))), vec!["js-watch".to_string()]);
        assert_eq!(dispatched(&core.step(changed("css-build"))), vec!["css-build".to_string()]);

        let step = core.step(done("js-watch", TaskOutcome::Failed("bundle error".into())));
        assert!(step.keep_running);
        assert_eq!(
            core.scheduler().run_state_of("css-build"),
            Some(crate::dag::TaskRunState::Running)
        );

        let step = core.step(done("css-build", TaskOutcome::Success));
        assert!(step.keep_running);
        assert!(core.is_idle());
    }
}
