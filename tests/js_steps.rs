// tests/js_steps.rs

use assetdag::engine::{RuntimeEvent, TriggerReason};
use assetdag::exec::{ToolExit, ToolLine, ToolOutput};
use assetdag::steps::js::{self, BUILD_DONE_MESSAGE, BUILD_ERROR_MESSAGE, LINT_ERROR_MESSAGE};
use assetdag::steps::StepOutcome;
use assetdag::types::{BuildMode, SessionMode, SessionPhase};
use assetdag_test_utils::{ConfigBuilder, FakeToolRunner, StepHarness, ToolReply, with_timeout};
use tokio::sync::mpsc;

fn live() -> SessionMode {
    SessionMode::new(BuildMode::Development, SessionPhase::Live)
}

fn initial() -> SessionMode {
    SessionMode::initial(BuildMode::Development)
}

fn harness(tools: FakeToolRunner) -> StepHarness {
    StepHarness::with_tools(ConfigBuilder::new().build(), tools)
}

#[tokio::test]
async fn lint_runs_before_bundle() {
    let h = harness(FakeToolRunner::new());

    assert_eq!(js::run(&h.ctx, live()).await, StepOutcome::Success);
    assert_eq!(h.tools.calls(), vec!["npx eslint", "npx webpack"]);
    assert_eq!(h.notifier.messages(), vec![BUILD_DONE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn lint_failure_notifies_but_still_bundles() {
    let tools = FakeToolRunner::new().reply(
        "eslint",
        ToolReply::Output(ToolOutput::failure(1, "no-unused-vars")),
    );
    let h = harness(tools);

    assert_eq!(js::run(&h.ctx, initial()).await, StepOutcome::Success);
    assert_eq!(h.tools.calls(), vec!["npx eslint", "npx webpack"]);
    assert_eq!(h.notifier.errors(), vec![LINT_ERROR_MESSAGE.to_string()]);
}

#[tokio::test]
async fn development_and_production_bundler_args_differ() {
    let h = harness(FakeToolRunner::new());
    js::bundle(&h.ctx, initial()).await;
    js::bundle(&h.ctx, SessionMode::initial(BuildMode::Production)).await;

    let invocations = h.tools.invocations();
    assert!(invocations[0].has_arg("development"));
    assert!(invocations[1].has_arg("production"));
    assert!(invocations[1].has_arg("--no-devtool"));
}

#[tokio::test]
async fn bundle_errors_are_soft_failures() {
    let tools = FakeToolRunner::new().reply(
        "webpack",
        ToolReply::Output(ToolOutput::failure(2, "Module not found")),
    );
    let h = harness(tools);

    let outcome = js::bundle(&h.ctx, initial()).await;
    assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("Module not found")));
    // Not live yet: the abort itself reports the error.
    assert!(h.notifier.errors().is_empty());

    let outcome = js::bundle(&h.ctx, live()).await;
    assert!(matches!(outcome, StepOutcome::Failed(_)));
    assert_eq!(h.notifier.errors(), vec![BUILD_ERROR_MESSAGE.to_string()]);
}

#[tokio::test]
async fn bundler_that_cannot_start_is_fatal() {
    let tools = FakeToolRunner::new().reply("webpack", ToolReply::SpawnError("npx: not found".into()));
    let h = harness(tools);

    let outcome = js::bundle(&h.ctx, live()).await;
    assert!(matches!(outcome, StepOutcome::Fatal(ref m) if m.contains("not found")), "{outcome:?}");
}

#[tokio::test]
async fn killed_bundler_is_fatal() {
    let tools = FakeToolRunner::new().reply(
        "webpack",
        ToolReply::Output(ToolOutput {
            exit: ToolExit::Signalled,
            stdout: String::new(),
            stderr: String::new(),
        }),
    );
    let h = harness(tools);

    assert!(matches!(js::bundle(&h.ctx, live()).await, StepOutcome::Fatal(_)));
}

fn out(line: &str) -> ToolLine {
    ToolLine::Stdout(line.to_string())
}

#[tokio::test]
async fn watching_bundler_reports_each_pass() {
    let tools = FakeToolRunner::new().reply(
        "webpack",
        ToolReply::Stream(vec![
            out("asset main.js 12 KiB"),
            out("webpack 5.90.0 compiled successfully in 10 ms"),
            ToolLine::Stderr("ERROR in ./src/js/app.js".to_string()),
            out("webpack 5.90.0 compiled with 1 error in 5 ms"),
        ]),
    );
    let StepHarness { ctx, tools, notifier, .. } = harness(tools);
    let (tx, mut rx) = mpsc::channel(8);
    let ctx = ctx.with_runtime_events(tx);

    // First pass completes the step.
    assert_eq!(with_timeout(js::run_watch(&ctx, initial(), "js-watch")).await, StepOutcome::Success);
    assert!(tools.invocations()[0].has_arg("--watch"));
    assert!(notifier.all().is_empty());

    // The second pass asks for js-watch to run again.
    match with_timeout(rx.recv()).await {
        Some(RuntimeEvent::TaskTriggered { task, reason }) => {
            assert_eq!(task, "js-watch");
            assert_eq!(reason, TriggerReason::BundlerPass);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let outcome = with_timeout(js::run_watch(&ctx, live(), "js-watch")).await;
    assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("ERROR in ./src/js/app.js")), "{outcome:?}");
    assert_eq!(notifier.errors(), vec![BUILD_ERROR_MESSAGE.to_string()]);

    // Nothing new: no lint, no notification, and the bundler is not restarted.
    assert_eq!(with_timeout(js::run_watch(&ctx, live(), "js-watch")).await, StepOutcome::Success);
    assert_eq!(tools.calls(), vec!["npx webpack", "npx eslint", "npx eslint"]);
    assert_eq!(notifier.all().len(), 1);
}

#[tokio::test]
async fn live_pass_reloads_the_page() {
    let tools = FakeToolRunner::new().reply(
        "webpack",
        ToolReply::Stream(vec![
            out("compiled successfully in 10 ms"),
            out("compiled successfully in 3 ms"),
        ]),
    );
    let StepHarness { ctx, notifier, .. } = harness(tools);
    let (tx, mut rx) = mpsc::channel(8);
    let ctx = ctx.with_runtime_events(tx);

    with_timeout(js::run_watch(&ctx, initial(), "js-watch")).await;
    with_timeout(rx.recv()).await;
    assert_eq!(with_timeout(js::run_watch(&ctx, live(), "js-watch")).await, StepOutcome::Success);
    assert_eq!(notifier.messages(), vec![BUILD_DONE_MESSAGE.to_string()]);
}

#[tokio::test]
async fn bundler_exiting_before_its_first_pass_is_fatal() {
    let tools = FakeToolRunner::new().reply(
        "webpack",
        ToolReply::Stream(vec![
            ToolLine::Stderr("Unknown option --watch".to_string()),
            ToolLine::Exited(ToolExit::Code(2)),
        ]),
    );
    let h = harness(tools);

    let outcome = with_timeout(js::run_watch(&h.ctx, initial(), "js-watch")).await;
    assert!(matches!(outcome, StepOutcome::Fatal(ref m) if m.contains("Unknown option")), "{outcome:?}");
}

#[tokio::test]
async fn watching_bundler_that_cannot_start_is_fatal() {
    let tools = FakeToolRunner::new().reply("webpack", ToolReply::SpawnError("npx: not found".into()));
    let h = harness(tools);

    let outcome = with_timeout(js::run_watch(&h.ctx, initial(), "js-watch")).await;
    assert!(matches!(outcome, StepOutcome::Fatal(ref m) if m.contains("not found")), "{outcome:?}");
}
