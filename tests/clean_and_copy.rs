// tests/clean_and_copy.rs

use std::path::PathBuf;

use assetdag::steps::{StepOutcome, clean, copy};
use assetdag::types::{BuildMode, SessionMode};
use assetdag_test_utils::{ConfigBuilder, StepHarness};

fn files(h: &StepHarness) -> Vec<String> {
    h.fs.file_paths()
        .into_iter()
        .map(|p: PathBuf| p.to_string_lossy().trim_start_matches("./").to_string())
        .collect()
}

#[test]
fn clean_removes_only_generated_outputs() {
    let h = StepHarness::new(ConfigBuilder::new().build());
    h.file("website/css/main.css", "");
    h.file("website/css/main.css.map", "");
    h.file("website/css/assets/logo.svg", "");
    h.file("website/css/vendor/vendor.css", "");
    h.file("website/css/vendor/fonts/font.woff", "");
    h.file("website/templates/page.html", "");
    h.file("website/js/app.js", "");
    h.file("website/index.html", "");
    h.file("website/data/data.json", "{}");

    let removed = clean::run(&h.ctx).unwrap();
    assert_eq!(removed, 6);
    assert_eq!(
        files(&h),
        vec![
            "website/css/vendor/fonts/font.woff",
            "website/data/data.json",
            "website/index.html",
        ]
    );
}

#[test]
fn clean_on_missing_build_dir_is_a_no_op() {
    let h = StepHarness::new(ConfigBuilder::new().build());
    assert_eq!(clean::run(&h.ctx).unwrap(), 0);
}

#[test]
fn templates_keep_their_relative_paths() {
    let h = StepHarness::new(ConfigBuilder::new().build());
    h.file("src/templates/home.html", "<h1>home</h1>");
    h.file("src/templates/partials/nav.html", "<nav></nav>");
    h.file("src/templates/README.md", "ignored");

    let outcome = copy::run_templates(&h.ctx, SessionMode::initial(BuildMode::Development));
    assert_eq!(outcome, StepOutcome::Success);
    assert_eq!(h.read("website/templates/home.html").as_deref(), Some("<h1>home</h1>"));
    assert!(h.read("website/templates/partials/nav.html").is_some());
    assert!(h.read("website/templates/README.md").is_none());
}

#[test]
fn root_files_land_relative_to_their_glob_base() {
    let cfg = ConfigBuilder::new()
        .root("src/*.html")
        .root("src/favicon.ico")
        .root("src/root/**/*")
        .root("!src/root/**/*.bak")
        .build();
    let h = StepHarness::new(cfg);
    h.file("src/index.html", "<html></html>");
    h.file("src/favicon.ico", "ico");
    h.file("src/root/robots.txt", "User-agent: *");
    h.file("src/root/.well-known/security.txt", "contact");
    h.file("src/root/old.bak", "x");
    h.file("src/scss/main.scss", "");

    let copied = copy::copy_root_files(&h.ctx).unwrap();
    assert_eq!(copied, 4);
    assert!(h.read("website/index.html").is_some());
    assert_eq!(h.read("website/favicon.ico").as_deref(), Some("ico"));
    assert!(h.read("website/robots.txt").is_some());
    assert!(h.read("website/.well-known/security.txt").is_some());
    assert!(h.read("website/old.bak").is_none());
    assert!(h.read("website/scss/main.scss").is_none());
}
