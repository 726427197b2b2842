// tests/css_steps.rs

use std::path::Path;

use assetdag::config::ToolSpec;
use assetdag::exec::ToolOutput;
use assetdag::steps::vendor::VENDOR_BUNDLE;
use assetdag::steps::{StepOutcome, css, vendor};
use assetdag::types::{BuildMode, SessionMode, SessionPhase};
use assetdag_test_utils::{ConfigBuilder, FakeToolRunner, StepHarness, ToolReply};

fn harness_with(tools: FakeToolRunner) -> StepHarness {
    let cfg = ConfigBuilder::new()
        .include_path("node_modules")
        .vendor("vendor/a.css")
        .vendor("vendor/b.css")
        .build();
    StepHarness::with_tools(cfg, tools)
}

#[tokio::test]
async fn compiles_each_entry_with_glob_imports_expanded() {
    let h = harness_with(FakeToolRunner::new());
    h.file("src/scss/main.scss", "@import \"components/*.scss\";\n");
    h.file("src/scss/components/_card.scss", ".card {}");
    h.file("src/scss/_variables.scss", "$x: 1;");

    let outcome = css::run(&h.ctx, SessionMode::initial(BuildMode::Development)).await;
    assert_eq!(outcome, StepOutcome::Success);

    // One entry: sass then postcss. Partials are not compiled on their own.
    assert_eq!(h.tools.calls(), vec!["sass --stdin", "npx postcss"]);

    let sass = &h.tools.invocations()[0];
    let stdin = String::from_utf8(sass.stdin.clone().unwrap()).unwrap();
    assert_eq!(stdin, "@import \"components/_card.scss\";\n");
    assert!(sass.has_arg("--load-path=src/scss"));
    assert!(sass.has_arg("--load-path=node_modules"));
    assert!(!sass.has_arg("--no-source-map"));
    assert_eq!(sass.args.last().map(String::as_str), Some("website/css/main.css"));
    assert_eq!(sass.cwd, Path::new("."));

    let postcss = &h.tools.invocations()[1];
    assert!(postcss.has_arg("--map"));
    assert!(!postcss.has_arg("cssnano"));
}

#[tokio::test]
async fn production_drops_source_maps_and_minifies() {
    let h = harness_with(FakeToolRunner::new());
    h.file("src/scss/main.scss", "body {}");

    let outcome = css::run(&h.ctx, SessionMode::initial(BuildMode::Production)).await;
    assert_eq!(outcome, StepOutcome::Success);

    let invocations = h.tools.invocations();
    assert!(invocations[0].has_arg("--no-source-map"));
    assert!(invocations[1].has_arg("--no-map"));
    assert!(invocations[1].has_arg("cssnano"));
}

#[tokio::test]
async fn sass_errors_fail_the_step_and_notify() {
    let tools = FakeToolRunner::new().reply(
        "sass",
        ToolReply::Output(ToolOutput::failure(65, "Error: expected \"}\".")),
    );
    let h = harness_with(tools);
    h.file("src/scss/main.scss", "body {");

    let live = SessionMode::new(BuildMode::Development, SessionPhase::Live);
    let outcome = css::run(&h.ctx, live).await;

    assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("expected")), "{outcome:?}");
    assert_eq!(h.tools.calls(), vec!["sass --stdin"]);
    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Error: "));
}

#[tokio::test]
async fn custom_sass_program_is_used() {
    let h = StepHarness::new(
        ConfigBuilder::new()
            .sass(ToolSpec::new("npx", &["sass"]).with_production_args(&["--style=compressed"]))
            .build(),
    );
    h.file("src/scss/app.scss", "a {}");

    css::run(&h.ctx, SessionMode::initial(BuildMode::Production)).await;
    let sass = &h.tools.invocations()[0];
    assert_eq!(sass.program, "npx");
    assert_eq!(sass.args[..3], ["sass", "--style=compressed", "--stdin"]);
}

#[tokio::test]
async fn vendor_files_are_concatenated_in_order() {
    let h = harness_with(FakeToolRunner::new());
    h.file("vendor/a.css", "a { color: red; }");
    h.file("vendor/b.css", "b { color: blue; }\n");

    let outcome = vendor::run(&h.ctx, SessionMode::initial(BuildMode::Development)).await;
    assert_eq!(outcome, StepOutcome::Success);

    let bundle = h.read(format!("website/{VENDOR_BUNDLE}")).unwrap();
    assert_eq!(bundle, "a { color: red; }\nb { color: blue; }\n");
    assert_eq!(h.tools.calls(), vec!["npx postcss"]);
    assert!(h.tools.invocations()[0].has_arg("website/css/vendor/vendor.css"));
}

#[tokio::test]
async fn missing_vendor_file_fails() {
    let h = harness_with(FakeToolRunner::new());
    h.file("vendor/a.css", "a {}");

    let outcome = vendor::run(&h.ctx, SessionMode::initial(BuildMode::Development)).await;
    assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("vendor/b.css")), "{outcome:?}");
    assert!(h.tools.calls().is_empty());
}
