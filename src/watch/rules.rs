// src/watch/rules.rs

use crate::config::PipelineConfig;
use crate::engine::TaskName;

/// Re-run `task` whenever a file matching `patterns` (and none of
/// `exclude`) changes. Patterns are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub task: TaskName,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
}

impl WatchRule {
    pub fn new(task: &str, patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            task: task.to_string(),
            patterns: patterns.into_iter().collect(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, patterns: impl IntoIterator<Item = String>) -> Self {
        self.exclude.extend(patterns);
        self
    }
}

/// The rules registered by `install-watch`.
///
/// Root-file globs starting with `!` are treated as excludes. JavaScript has
/// no rule: the bundler runs in watch mode and tracks its own inputs.
pub fn standard_rules(config: &PipelineConfig) -> Vec<WatchRule> {
    let src = config.src_glob_prefix();

    let root = config.root_globs();

    vec![
        WatchRule::new("css-build", [format!("{src}/scss/**/*.scss")]),
        WatchRule::new("templates-build", [format!("{src}/templates/**/*.html")]),
        WatchRule::new("root-files-build", root.includes).excluding(root.excludes),
        WatchRule::new("data-build", [format!("{src}/data/**/*.json")]),
    ]
}
