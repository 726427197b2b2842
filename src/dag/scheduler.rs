// src/dag/scheduler.rs

//! Run bookkeeping for a compiled plan.
//!
//! A run starts when something is triggered while the scheduler is idle and
//! ends once every participating task has settled. A task requested on its
//! own (a file-watch trigger) is standalone for that run: it does not wait
//! for its dependencies and is not failed by them.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::dag::catalog::PipelinePlan;
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};

/// What a single trigger or completion changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that should be dispatched now.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// The active run settled during this step.
    pub run_just_finished: bool,
}

#[derive(Debug)]
pub struct Scheduler {
    /// Ordered by name so dispatch order is stable.
    tasks: BTreeMap<TaskName, TaskInfo>,
    /// Reverse edges: task -> tasks that list it as a dependency.
    dependents: HashMap<TaskName, Vec<TaskName>>,
    runs_started: u64,
    active_run: Option<u64>,
}

impl Scheduler {
    pub fn from_plan(plan: &PipelinePlan) -> Self {
        let mut tasks = BTreeMap::new();
        let mut dependents: HashMap<TaskName, Vec<TaskName>> = HashMap::new();

        for planned in plan.tasks() {
            for dep in &planned.deps {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(planned.def.name.clone());
            }
            tasks.insert(planned.def.name.clone(), TaskInfo::from_plan(planned));
        }

        Self {
            tasks,
            dependents,
            runs_started: 0,
            active_run: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_run.is_none()
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        self.tasks.get(task).map(|info| info.run_state)
    }

    /// Open a fresh run. Per-run state is cleared; success history is kept.
    pub fn start_new_run(&mut self) {
        self.runs_started += 1;
        self.active_run = Some(self.runs_started);
        self.tasks
            .values_mut()
            .for_each(|info| {
                info.run_state = TaskRunState::NotInRun;
                info.standalone = false;
            });
        debug!(run_id = self.runs_started, "run opened");
    }

    /// Request `target` and its whole dependency closure.
    pub fn trigger_with_dependencies(&mut self, target: &str) -> Vec<ScheduledTask> {
        self.trigger(target, true).newly_scheduled
    }

    /// Request `task` alone; it is dispatched without waiting on anything.
    pub fn trigger_only(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger(task, false).newly_scheduled
    }

    pub fn handle_completion(&mut self, task: &str, outcome: &TaskOutcome) -> Vec<ScheduledTask> {
        self.step_completion(task, outcome).newly_scheduled
    }

    pub fn step_completion(&mut self, task: &str, outcome: &TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.active_run else {
            warn!(task = %task, "completion outside of a run; ignoring");
            return SchedulerStep::default();
        };

        let mut newly_scheduled = Vec::new();
        match self.tasks.get_mut(task) {
            Some(info) if outcome.is_success() => {
                info.run_state = TaskRunState::DoneSuccess;
                info.last_successful_run = Some(run_id);
                debug!(task = %task, run_id, "task succeeded");
                newly_scheduled = self.dispatch_ready();
            }
            Some(info) => {
                info.run_state = TaskRunState::DoneFailed;
                info.last_failed_run = Some(run_id);
                warn!(task = %task, run_id, outcome = ?outcome, "task failed; skipping its dependents");
                self.fail_dependents(task);
            }
            None => warn!(task = %task, "completion for unknown task; ignoring"),
        }

        SchedulerStep {
            newly_scheduled,
            run_just_finished: self.close_run_if_settled(),
        }
    }

    fn trigger(&mut self, task: &str, with_dependencies: bool) -> SchedulerStep {
        if self.active_run.is_none() {
            self.start_new_run();
        }

        if !self.tasks.contains_key(task) {
            warn!(task = %task, "trigger for unknown task; ignoring");
        } else if with_dependencies {
            self.enlist_closure(task);
        } else if self.run_state_of(task) == Some(TaskRunState::NotInRun) {
            self.enlist(task);
            if let Some(info) = self.tasks.get_mut(task) {
                info.standalone = true;
            }
        }

        SchedulerStep {
            newly_scheduled: self.dispatch_ready(),
            run_just_finished: self.close_run_if_settled(),
        }
    }

    /// Pull a task into the run unless it already takes part.
    fn enlist(&mut self, task: &str) -> bool {
        match self.tasks.get_mut(task) {
            Some(info) => {
                if info.run_state == TaskRunState::NotInRun {
                    info.run_state = TaskRunState::Pending;
                }
                true
            }
            None => false,
        }
    }

    fn enlist_closure(&mut self, target: &str) {
        let mut stack = vec![target.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if !self.enlist(&name) {
                warn!(task = %name, "dependency has no task entry");
                continue;
            }
            if let Some(info) = self.tasks.get(&name) {
                stack.extend(info.deps.iter().cloned());
            }
        }
    }

    /// A dependency counts when it succeeded in this run, or sat this run
    /// out after succeeding in an earlier one. Standalone tasks never wait.
    fn deps_ready(&self, info: &TaskInfo) -> bool {
        if info.standalone {
            return true;
        }
        info.deps.iter().all(|dep| match self.tasks.get(dep) {
            Some(dep) => match dep.run_state {
                TaskRunState::DoneSuccess => true,
                TaskRunState::NotInRun => dep.last_successful_run.is_some(),
                _ => false,
            },
            None => false,
        })
    }

    fn dispatch_ready(&mut self) -> Vec<ScheduledTask> {
        let run_id = self.active_run.unwrap_or(0);
        let ready: Vec<TaskName> = self
            .tasks
            .values()
            .filter(|info| info.run_state == TaskRunState::Pending && self.deps_ready(info))
            .map(|info| info.name.clone())
            .collect();

        let mut scheduled = Vec::with_capacity(ready.len());
        for name in ready {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.has_run_before() {
                info!(task = %name, run_id, "re-running task");
            } else {
                info!(task = %name, run_id, "starting task");
            }
            info.run_state = TaskRunState::Running;
            scheduled.push(ScheduledTask::from_task_info(info, run_id));
        }
        scheduled
    }

    /// Everything downstream of `failed` that is still waiting in this run
    /// is marked failed without running. Standalone tasks are left alone.
    fn fail_dependents(&mut self, failed: &str) {
        let mut stack = self.dependents.get(failed).cloned().unwrap_or_default();
        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if !info.standalone && !info.run_state.is_settled() {
                info.run_state = TaskRunState::DoneFailed;
                debug!(task = %name, upstream = %failed, "skipped after upstream failure");
                if let Some(next) = self.dependents.get(&name) {
                    stack.extend(next.iter().cloned());
                }
            }
        }
    }

    fn close_run_if_settled(&mut self) -> bool {
        let Some(run_id) = self.active_run else {
            return false;
        };
        if !self.tasks.values().all(|info| info.run_state.is_settled()) {
            return false;
        }
        info!(run_id, "run settled");
        self.active_run = None;
        true
    }
}
