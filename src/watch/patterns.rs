// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};

use crate::engine::TaskName;
use crate::watch::rules::WatchRule;

/// Compiled watch/exclude glob patterns for a single task.
///
/// The patterns are relative to the project root; the watcher passes
/// relative paths (e.g. `"src/scss/main.scss"`) into `matches`.
#[derive(Clone)]
pub struct TaskWatchProfile {
    name: TaskName,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for TaskWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWatchProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskWatchProfile {
    /// Name of the task this profile triggers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the task is interested in `rel_path`.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile one profile per rule.
pub fn build_task_watch_profiles(rules: &[WatchRule]) -> Result<Vec<TaskWatchProfile>> {
    rules
        .iter()
        .map(|rule| {
            let watch_set = build_globset(&rule.patterns)
                .with_context(|| format!("building watch globset for task {}", rule.task))?;

            let exclude_set = if rule.exclude.is_empty() {
                None
            } else {
                Some(
                    build_globset(&rule.exclude).with_context(|| {
                        format!("building exclude globset for task {}", rule.task)
                    })?,
                )
            };

            Ok(TaskWatchProfile {
                name: rule.task.clone(),
                watch_set,
                exclude_set,
            })
        })
        .collect()
}

/// Build a GlobSet from simple string patterns.
///
/// `*` does not cross `/`; only `**` spans directories.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

/// Compile a single pattern with the same options as [`build_globset`].
pub fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_respects_excludes() {
        let rule = WatchRule::new("root-files-build", ["src/*.txt".to_string()])
            .excluding(["src/secret.txt".to_string()]);
        let profiles = build_task_watch_profiles(&[rule]).unwrap();
        let p = &profiles[0];

        assert!(p.matches("src/robots.txt"));
        assert!(!p.matches("src/secret.txt"));
        assert!(!p.matches("src/nested/robots.txt"));
    }

    #[test]
    fn double_star_spans_directories() {
        let set = build_globset(&["src/scss/**/*.scss".to_string()]).unwrap();
        assert!(set.is_match("src/scss/main.scss"));
        assert!(set.is_match("src/scss/components/_button.scss"));
        assert!(!set.is_match("src/js/app.js"));
    }
}
