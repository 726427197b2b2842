// src/dag/mod.rs

//! Task declarations, compiled plans and run scheduling.

pub mod catalog;
pub mod scheduler;
pub mod task_info;

pub use catalog::{
    PipelineDef, PipelinePlan, PlannedTask, Sequence, StepKind, TaskCatalog, TaskCategory,
    TaskDef,
};
pub use scheduler::{Scheduler, SchedulerStep};
pub use task_info::{ScheduledTask, TaskRunState};
