// src/watch/event_handler.rs

//! Turning a changed path into task triggers.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TaskName, TriggerReason};
use crate::fs::FileSystem;
use crate::watch::hash::ContentTracker;
use crate::watch::patterns::TaskWatchProfile;

/// Shared inputs for processing watcher events.
#[derive(Debug)]
pub struct WatchContext {
    pub root: std::path::PathBuf,
    /// Build output directory relative to `root`, forward slashes.
    pub build_rel: String,
    pub profiles: Vec<TaskWatchProfile>,
}

impl WatchContext {
    /// Tasks bound to `rel_path`, in rule order, without duplicates.
    pub fn matching_tasks(&self, rel_path: &str) -> Vec<TaskName> {
        let mut tasks: Vec<TaskName> = Vec::new();
        for profile in self.profiles.iter().filter(|p| p.matches(rel_path)) {
            if !tasks.iter().any(|t| t == profile.name()) {
                tasks.push(profile.name().to_string());
            }
        }
        tasks
    }

    fn is_build_output(&self, rel_path: &str) -> bool {
        let build = self.build_rel.trim_end_matches('/');
        rel_path == build || rel_path.starts_with(&format!("{build}/"))
    }
}

/// Process a single changed path.
///
/// Sends one `FileWatch` trigger per matching task, unless the path lives
/// in the build directory or its content is unchanged since the last
/// accepted event.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    fs: &dyn FileSystem,
    ctx: &WatchContext,
    tracker: &mut ContentTracker,
    path: &Path,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    let Some(rel) = relative_str(&ctx.root, path) else {
        warn!(?path, root = ?ctx.root, "could not relativize event path");
        return true;
    };

    if ctx.is_build_output(&rel) {
        return true;
    }

    let tasks = ctx.matching_tasks(&rel);
    if tasks.is_empty() {
        return true;
    }

    if !tracker.observe(fs, path) {
        debug!(path = %rel, "content unchanged; not triggering");
        return true;
    }

    for task in tasks {
        debug!(task = %task, path = %rel, "watch match -> triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }

    true
}

/// `path` relative to `root` with forward slashes.
///
/// Falls back to comparing canonical paths, since some platforms report
/// events under a different absolute prefix (e.g. `/private/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Some(rel) = crate::fs::relative_slash_path(root, path) {
        return Some(rel);
    }

    let root_canon = root.canonicalize().ok()?;
    // A deleted file cannot be canonicalized; its parent usually can.
    let path_canon = path.canonicalize().ok().or_else(|| {
        let parent = path.parent()?.canonicalize().ok()?;
        Some(parent.join(path.file_name()?))
    })?;
    crate::fs::relative_slash_path(&root_canon, &path_canon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, RawPipelineConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::watch::patterns::build_task_watch_profiles;
    use crate::watch::rules::standard_rules;

    fn context() -> WatchContext {
        let raw: RawPipelineConfig = serde_json::from_str(
            r#"{ "root": ["src/*.txt"], "scssIncludePaths": [], "cssVendor": [] }"#,
        )
        .unwrap();
        let cfg = PipelineConfig::try_from(raw).unwrap();
        WatchContext {
            root: ".".into(),
            build_rel: "website".to_string(),
            profiles: build_task_watch_profiles(&standard_rules(&cfg)).unwrap(),
        }
    }

    #[test]
    fn each_source_area_maps_to_one_task() {
        let ctx = context();
        assert_eq!(ctx.matching_tasks("src/scss/a/b.scss"), vec!["css-build"]);
        assert_eq!(ctx.matching_tasks("src/templates/x.html"), vec!["templates-build"]);
        assert_eq!(ctx.matching_tasks("src/robots.txt"), vec!["root-files-build"]);
        assert_eq!(ctx.matching_tasks("src/data/nav.json"), vec!["data-build"]);
        assert!(ctx.matching_tasks("src/js/app.js").is_empty());
        assert!(ctx.matching_tasks("README.md").is_empty());
    }

    #[tokio::test]
    async fn change_triggers_bound_task_once() {
        let ctx = context();
        let fs = MockFileSystem::new();
        fs.add_file("./src/scss/main.scss", "body { color: red; }");
        let mut tracker = ContentTracker::new();
        let (tx, mut rx) = mpsc::channel(8);

        let path = Path::new("./src/scss/main.scss");
        assert!(process_file_change(&fs, &ctx, &mut tracker, path, &tx).await);
        // Same content again: filtered.
        assert!(process_file_change(&fs, &ctx, &mut tracker, path, &tx).await);
        drop(tx);

        let mut triggered = Vec::new();
        while let Some(RuntimeEvent::TaskTriggered { task, reason }) = rx.recv().await {
            assert_eq!(reason, TriggerReason::FileWatch);
            triggered.push(task);
        }
        assert_eq!(triggered, vec!["css-build".to_string()]);
    }

    #[tokio::test]
    async fn build_output_is_ignored() {
        let mut ctx = context();
        ctx.build_rel = "src/data/out".to_string();
        let fs = MockFileSystem::new();
        fs.add_file("./src/data/out/nav.json", "{}");
        let mut tracker = ContentTracker::new();
        let (tx, mut rx) = mpsc::channel(8);

        let path = Path::new("./src/data/out/nav.json");
        assert_eq!(ctx.matching_tasks("src/data/out/nav.json"), vec!["data-build"]);
        process_file_change(&fs, &ctx, &mut tracker, path, &tx).await;
        drop(tx);
        assert!(rx.recv().await.is_none());
    }
}
