// src/engine/mod.rs

//! Session orchestration.
//!
//! [`core`] decides what happens for each [`RuntimeEvent`] without doing any
//! IO. [`runtime`] owns the channel and the executor and applies the core's
//! commands. Triggers that arrive mid-run wait in [`queue`].

pub type TaskName = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// The step failed; whether that aborts the session depends on the phase.
    Failed(String),
    /// Aborts in any phase, e.g. the bundler could not be started.
    Fatal(String),
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// The requested entry point; its whole dependency closure runs.
    EntryPoint,
    /// A watched file changed; only the bound task runs.
    FileWatch,
    /// The watching bundler finished another pass; only the bound task runs.
    BundlerPass,
}

/// Input to the runtime, sent by `run`, the watcher, the executor and the
/// Ctrl-C handler.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use crate::types::TriggerWhileRunningBehaviour;
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runtime::Runtime;
