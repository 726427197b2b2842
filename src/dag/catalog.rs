// src/dag/catalog.rs

//! Declarative task catalogue and entry-point pipelines.
//!
//! Tasks declare their direct dependencies; entry points are expressed as a
//! [`Sequence`] of task sets. [`TaskCatalog::compile`] turns one entry point
//! into a [`PipelinePlan`]: a DAG whose edges are the declared dependencies
//! plus the ordering implied by the sequence. Unknown names and cycles are
//! rejected here, before anything runs.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::engine::TaskName;
use crate::errors::{PipelineError, Result};

/// Side-effect category of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCategory {
    /// Produces files in the build directory.
    BuildStep,
    /// Coordinates other tasks (notifications, watch registration, entry points).
    Meta,
    /// Starts a long-running service.
    Server,
}

/// The unit of work a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Clean,
    JsBuild,
    JsWatch,
    CssBuild,
    CssVendorBuild,
    TemplatesBuild,
    RootFilesBuild,
    DataBuild,
    BuildNotify,
    InstallWatch,
    DevServer,
    /// Synthetic final node of an entry point; does nothing itself.
    EntryPoint,
}

/// A named unit of work with declared dependencies.
#[derive(Debug, Clone)]
pub struct TaskDef {
    pub name: TaskName,
    pub category: TaskCategory,
    pub step: StepKind,
    pub after: Vec<TaskName>,
}

impl TaskDef {
    pub fn new(name: &str, category: TaskCategory, step: StepKind) -> Self {
        Self {
            name: name.to_string(),
            category,
            step,
            after: Vec::new(),
        }
    }

    pub fn after(mut self, deps: &[&str]) -> Self {
        self.after.extend(deps.iter().map(|d| d.to_string()));
        self
    }
}

/// Ordered list of task sets: set N+1 starts only once every task of set N
/// has completed.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    stages: Vec<Vec<TaskName>>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage whose members may run concurrently.
    pub fn then(mut self, tasks: &[&str]) -> Self {
        self.stages
            .push(tasks.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn stages(&self) -> &[Vec<TaskName>] {
        &self.stages
    }
}

/// A named entry point (`build`, `watch`, `data`).
#[derive(Debug, Clone)]
pub struct PipelineDef {
    pub name: TaskName,
    pub sequence: Sequence,
    /// Whether completing the sequence starts a live watch session.
    pub continues_watching: bool,
}

impl PipelineDef {
    pub fn new(name: &str, sequence: Sequence) -> Self {
        Self {
            name: name.to_string(),
            sequence,
            continues_watching: false,
        }
    }

    pub fn watching(mut self) -> Self {
        self.continues_watching = true;
        self
    }
}

/// A task as it appears in a compiled plan: its definition plus the full set
/// of edges (declared and sequence-derived).
#[derive(Debug, Clone)]
pub struct PlannedTask {
    pub def: TaskDef,
    pub deps: Vec<TaskName>,
}

/// Result of compiling one entry point.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    target: TaskName,
    continues_watching: bool,
    tasks: BTreeMap<TaskName, PlannedTask>,
}

impl PipelinePlan {
    /// Name of the final node (same as the entry point name).
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn continues_watching(&self) -> bool {
        self.continues_watching
    }

    pub fn tasks(&self) -> impl Iterator<Item = &PlannedTask> {
        self.tasks.values()
    }

    pub fn task(&self, name: &str) -> Option<&PlannedTask> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Group tasks into layers where each layer only depends on earlier ones.
    ///
    /// Tasks in the same layer may run concurrently. Used for `--dry-run`
    /// output and tests.
    pub fn layers(&self) -> Vec<Vec<TaskName>> {
        let mut depth: BTreeMap<&str, usize> = BTreeMap::new();
        let mut remaining: Vec<&PlannedTask> = self.tasks.values().collect();

        // The plan is acyclic, so every pass places at least one task.
        while !remaining.is_empty() {
            let mut next = Vec::new();
            for task in remaining {
                let placed: Option<usize> = task.deps.iter().try_fold(0usize, |acc, dep| {
                    depth.get(dep.as_str()).map(|d| acc.max(d + 1))
                });
                match placed {
                    Some(d) => {
                        depth.insert(task.def.name.as_str(), d);
                    }
                    None => next.push(task),
                }
            }
            remaining = next;
        }

        let mut layers: Vec<Vec<TaskName>> = Vec::new();
        for (name, d) in depth {
            if layers.len() <= d {
                layers.resize_with(d + 1, Vec::new);
            }
            layers[d].push(name.to_string());
        }
        layers
    }
}

/// All known tasks and entry points.
#[derive(Debug, Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<TaskName, TaskDef>,
    pipelines: BTreeMap<TaskName, PipelineDef>,
}

impl TaskCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: TaskDef) -> Self {
        self.tasks.insert(task.name.clone(), task);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineDef) -> Self {
        self.pipelines.insert(pipeline.name.clone(), pipeline);
        self
    }

    /// The asset pipeline: `build`, `watch` and `data` entry points.
    pub fn standard() -> Self {
        use StepKind::*;
        use TaskCategory::*;

        const BUILD_STEPS: [&str; 5] = [
            "css-build",
            "css-vendor-build",
            "templates-build",
            "root-files-build",
            "data-build",
        ];

        Self::new()
            .with_task(TaskDef::new("clean", BuildStep, Clean))
            .with_task(TaskDef::new("js-build", BuildStep, JsBuild))
            .with_task(TaskDef::new("js-watch", BuildStep, JsWatch))
            .with_task(TaskDef::new("css-build", BuildStep, CssBuild))
            .with_task(TaskDef::new("css-vendor-build", BuildStep, CssVendorBuild))
            .with_task(TaskDef::new("templates-build", BuildStep, TemplatesBuild))
            .with_task(TaskDef::new("root-files-build", BuildStep, RootFilesBuild))
            .with_task(TaskDef::new("data-build", BuildStep, DataBuild))
            .with_task(TaskDef::new("build-steps", Meta, BuildNotify).after(&BUILD_STEPS))
            .with_task(TaskDef::new("install-watch", Meta, InstallWatch))
            .with_task(TaskDef::new("dev-server", Server, DevServer))
            .with_pipeline(PipelineDef::new(
                "build",
                Sequence::new()
                    .then(&["clean"])
                    .then(&["js-build"])
                    .then(&["build-steps"]),
            ))
            .with_pipeline(
                PipelineDef::new(
                    "watch",
                    Sequence::new()
                        .then(&["clean"])
                        .then(&["js-watch"])
                        .then(&["build-steps"])
                        .then(&["install-watch"])
                        .then(&["dev-server"]),
                )
                .watching(),
            )
            .with_pipeline(PipelineDef::new("data", Sequence::new().then(&["data-build"])))
    }

    /// Compile the entry point `target` into a validated plan.
    pub fn compile(&self, target: &str) -> Result<PipelinePlan> {
        let pipeline = self
            .pipelines
            .get(target)
            .ok_or_else(|| PipelineError::TaskNotFound(target.to_string()))?;

        if self.tasks.contains_key(target) {
            return Err(PipelineError::ConfigError(format!(
                "entry point '{target}' clashes with a task of the same name"
            )));
        }

        let mut planned: BTreeMap<TaskName, PlannedTask> = BTreeMap::new();
        let mut prev_stage: Vec<TaskName> = Vec::new();

        for stage in pipeline.sequence.stages() {
            let closure = self.dependency_closure(stage, &planned)?;

            for name in closure.iter() {
                let def = self.tasks[name].clone();
                let mut deps = def.after.clone();

                // Local roots of this stage wait for every task of the
                // previous stage.
                let has_local_dep = def.after.iter().any(|d| closure.contains(d));
                if !has_local_dep {
                    for prev in prev_stage.iter() {
                        if !deps.contains(prev) {
                            deps.push(prev.clone());
                        }
                    }
                }

                planned.insert(name.clone(), PlannedTask { def, deps });
            }

            prev_stage = stage.clone();
        }

        planned.insert(
            target.to_string(),
            PlannedTask {
                def: TaskDef::new(target, TaskCategory::Meta, StepKind::EntryPoint),
                deps: prev_stage,
            },
        );

        validate_acyclic(&planned)?;

        Ok(PipelinePlan {
            target: target.to_string(),
            continues_watching: pipeline.continues_watching,
            tasks: planned,
        })
    }

    /// Tasks of `stage` plus their transitive declared dependencies, minus
    /// anything already planned by an earlier stage.
    fn dependency_closure(
        &self,
        stage: &[TaskName],
        planned: &BTreeMap<TaskName, PlannedTask>,
    ) -> Result<BTreeSet<TaskName>> {
        let mut closure = BTreeSet::new();
        let mut stack: Vec<(TaskName, Option<TaskName>)> =
            stage.iter().map(|t| (t.clone(), None)).collect();

        while let Some((name, required_by)) = stack.pop() {
            if planned.contains_key(&name) || closure.contains(&name) {
                continue;
            }
            let def = self.tasks.get(&name).ok_or_else(|| match &required_by {
                Some(parent) => PipelineError::ConfigError(format!(
                    "task '{parent}' has unknown dependency '{name}'"
                )),
                None => PipelineError::TaskNotFound(name.clone()),
            })?;
            if def.after.contains(&name) {
                return Err(PipelineError::ConfigError(format!(
                    "task '{name}' cannot depend on itself"
                )));
            }
            closure.insert(name.clone());
            for dep in def.after.iter() {
                stack.push((dep.clone(), Some(name.clone())));
            }
        }

        Ok(closure)
    }
}

fn validate_acyclic(planned: &BTreeMap<TaskName, PlannedTask>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in planned.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in planned.iter() {
        for dep in task.deps.iter() {
            if !planned.contains_key(dep) {
                return Err(PipelineError::ConfigError(format!(
                    "task '{name}' has unknown dependency '{dep}'"
                )));
            }
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PipelineError::DagCycle(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
