// src/dag/task_info.rs

use crate::dag::catalog::{PlannedTask, StepKind, TaskCategory};
use crate::engine::TaskName;
use crate::types::SessionMode;

/// Where a task stands in the active run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskRunState {
    /// Not part of the active run (or there is none).
    #[default]
    NotInRun,
    /// Requested, waiting on dependencies.
    Pending,
    Running,
    DoneSuccess,
    /// Failed, or skipped because something upstream failed.
    DoneFailed,
}

impl TaskRunState {
    pub fn is_settled(self) -> bool {
        !matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

/// Scheduler-side record for one planned task.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub category: TaskCategory,
    pub step: StepKind,
    /// Declared plus sequence-derived dependencies.
    pub deps: Vec<TaskName>,
    pub run_state: TaskRunState,
    /// Requested on its own in the active run.
    pub standalone: bool,
    pub last_successful_run: Option<u64>,
    pub last_failed_run: Option<u64>,
}

impl TaskInfo {
    pub fn from_plan(task: &PlannedTask) -> Self {
        Self {
            name: task.def.name.clone(),
            category: task.def.category,
            step: task.def.step,
            deps: task.deps.clone(),
            run_state: TaskRunState::NotInRun,
            standalone: false,
            last_successful_run: None,
            last_failed_run: None,
        }
    }

    pub fn has_run_before(&self) -> bool {
        self.last_successful_run.is_some() || self.last_failed_run.is_some()
    }
}

/// A task handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub category: TaskCategory,
    pub step: StepKind,
    /// Shared by every task dispatched within one run.
    pub run_id: u64,
    /// Stamped by the runtime core at dispatch time.
    pub session: SessionMode,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            category: info.category,
            step: info.step,
            run_id,
            session: SessionMode::default(),
        }
    }
}
