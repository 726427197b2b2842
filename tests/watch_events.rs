// tests/watch_events.rs

use std::path::PathBuf;

use tokio::sync::mpsc;

use assetdag::engine::{RuntimeEvent, TriggerReason};
use assetdag::fs::mock::MockFileSystem;
use assetdag::watch::event_handler::process_file_change;
use assetdag::watch::{ContentTracker, WatchContext, build_task_watch_profiles, standard_rules};
use assetdag_test_utils::ConfigBuilder;

fn context() -> WatchContext {
    let cfg = ConfigBuilder::new()
        .root("src/*.html")
        .root("!src/draft.html")
        .build();
    let profiles = build_task_watch_profiles(&standard_rules(&cfg)).unwrap();
    WatchContext {
        root: PathBuf::from("."),
        build_rel: "website".to_string(),
        profiles,
    }
}

fn drain(rx: &mut mpsc::Receiver<RuntimeEvent>) -> Vec<String> {
    let mut tasks = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let RuntimeEvent::TaskTriggered { task, reason } = event {
            assert_eq!(reason, TriggerReason::FileWatch);
            tasks.push(task);
        }
    }
    tasks
}

#[test]
fn sources_map_to_their_build_tasks() {
    let ctx = context();
    assert_eq!(ctx.matching_tasks("src/scss/components/_card.scss"), vec!["css-build"]);
    assert_eq!(ctx.matching_tasks("src/templates/a/b.html"), vec!["templates-build"]);
    assert_eq!(ctx.matching_tasks("src/index.html"), vec!["root-files-build"]);
    assert_eq!(ctx.matching_tasks("src/data/site.json"), vec!["data-build"]);
    // The bundler watches its own inputs.
    assert!(ctx.matching_tasks("src/js/app/main.js").is_empty());
    assert!(ctx.matching_tasks("src/draft.html").is_empty());
    assert!(ctx.matching_tasks("README.md").is_empty());
}

#[test]
fn dot_slash_root_globs_are_watched() {
    let cfg = ConfigBuilder::new()
        .root("./src/index.html")
        .root("./src/static/**/*")
        .root("!./src/static/drafts/**")
        .build();
    let ctx = WatchContext {
        root: PathBuf::from("."),
        build_rel: "website".to_string(),
        profiles: build_task_watch_profiles(&standard_rules(&cfg)).unwrap(),
    };

    assert_eq!(ctx.matching_tasks("src/index.html"), vec!["root-files-build"]);
    assert_eq!(ctx.matching_tasks("src/static/img/logo.png"), vec!["root-files-build"]);
    assert!(ctx.matching_tasks("src/static/drafts/wip.txt").is_empty());
}

#[tokio::test]
async fn unchanged_content_does_not_retrigger() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/scss/main.scss", "a {}");
    let ctx = context();
    let mut tracker = ContentTracker::new();
    let (tx, mut rx) = mpsc::channel(8);
    let path = PathBuf::from("./src/scss/main.scss");

    assert!(process_file_change(&fs, &ctx, &mut tracker, &path, &tx).await);
    assert_eq!(drain(&mut rx), vec!["css-build"]);

    assert!(process_file_change(&fs, &ctx, &mut tracker, &path, &tx).await);
    assert!(drain(&mut rx).is_empty());

    fs.add_file("./src/scss/main.scss", "a { color: red; }");
    assert!(process_file_change(&fs, &ctx, &mut tracker, &path, &tx).await);
    assert_eq!(drain(&mut rx), vec!["css-build"]);
}

#[tokio::test]
async fn build_output_never_triggers() {
    let fs = MockFileSystem::new();
    // Serving straight out of `src`: every source path is also output.
    let ctx = WatchContext {
        build_rel: "src".to_string(),
        ..context()
    };
    let mut tracker = ContentTracker::new();
    let (tx, mut rx) = mpsc::channel(8);

    fs.add_file("./src/index.html", "<html></html>");
    process_file_change(&fs, &ctx, &mut tracker, &PathBuf::from("./src/index.html"), &tx).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn closed_runtime_channel_stops_processing() {
    let fs = MockFileSystem::new();
    fs.add_file("./src/data/a.json", "{}");
    let ctx = context();
    let mut tracker = ContentTracker::new();
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let keep_going =
        process_file_change(&fs, &ctx, &mut tracker, &PathBuf::from("./src/data/a.json"), &tx).await;
    assert!(!keep_going);
}
