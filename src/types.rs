use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Behaviour when a new trigger arrives for a task that is already part of
/// the active run.
///
/// - `Queue`: remember the trigger and start a follow-up run when the current
///   one finishes (default behaviour).
/// - `Cancel`: drop any previously queued batch and only keep the latest
///   trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Development vs. production output.
///
/// Selected once per invocation (`--dist` selects `Production`). Governs
/// source maps and minification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    pub fn from_dist_flag(dist: bool) -> Self {
        if dist {
            BuildMode::Production
        } else {
            BuildMode::Development
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }

    pub fn source_maps(self) -> bool {
        !self.is_production()
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

/// Where a session is in its lifecycle.
///
/// `Initial` covers the first pass through the requested entry point.
/// A watch session moves to `Live` exactly once, after its initial sequence
/// completes, and never moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Initial,
    Live,
}

/// Immutable per-dispatch view of how a step should behave.
///
/// The runtime core stamps the current value onto every scheduled task, so
/// steps never consult process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMode {
    pub build: BuildMode,
    pub phase: SessionPhase,
}

impl SessionMode {
    pub fn new(build: BuildMode, phase: SessionPhase) -> Self {
        Self { build, phase }
    }

    pub fn initial(build: BuildMode) -> Self {
        Self::new(build, SessionPhase::Initial)
    }

    /// Success notifications (and soft-failure notifications) are only
    /// emitted once the session is live.
    pub fn notifications_enabled(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    pub fn live_reload_enabled(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    /// Whether a failed step should abort the whole invocation.
    pub fn failures_are_fatal(&self) -> bool {
        self.phase == SessionPhase::Initial
    }
}
