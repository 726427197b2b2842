// tests/data_build.rs

use serde_json::{Value, json};

use assetdag::steps::data::{self, DATA_ERROR_MESSAGE, DataBuild};
use assetdag::steps::StepOutcome;
use assetdag::types::{BuildMode, SessionMode, SessionPhase};
use assetdag_test_utils::{ConfigBuilder, StepHarness};

const OUTPUT: &str = "website/data/data.json";

fn harness() -> StepHarness {
    StepHarness::new(ConfigBuilder::new().build())
}

fn written(h: &StepHarness) -> Value {
    serde_json::from_str(&h.read(OUTPUT).expect("data.json written")).unwrap()
}

#[test]
fn fragments_merge_in_path_order() {
    let h = harness();
    h.file("src/data/site.json", r#"{"site": {"title": "Later", "lang": "en"}}"#);
    h.file("src/data/a/defaults.json", r#"{"site": {"title": "Default", "menu": [1, 2]}, "year": 2020}"#);
    h.file("src/data/notes.txt", "not json");

    let result = data::build(&h.ctx).unwrap();
    assert_eq!(result, DataBuild::Written { fragments: 2 });
    assert_eq!(
        written(&h),
        json!({"site": {"title": "Later", "lang": "en", "menu": [1, 2]}, "year": 2020})
    );
}

#[test]
fn empty_data_directory_writes_empty_object() {
    let h = harness();
    assert_eq!(data::build(&h.ctx).unwrap(), DataBuild::Written { fragments: 0 });
    assert_eq!(written(&h), json!({}));
}

#[test]
fn invalid_fragment_blocks_the_write() {
    let h = harness();
    h.file("src/data/good.json", r#"{"a": 1}"#);
    h.file("src/data/bad.json", "{\n  \"b\": ,\n}");

    let DataBuild::Invalid(errors) = data::build(&h.ctx).unwrap() else {
        panic!("expected invalid build");
    };
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("src/data/bad.json:2:"), "{}", errors[0]);
    assert!(h.read(OUTPUT).is_none());
}

#[test]
fn invalid_data_fails_and_notifies_in_every_phase() {
    for phase in [SessionPhase::Initial, SessionPhase::Live] {
        let h = harness();
        h.file("src/data/list.json", "[1, 2, 3]");

        let outcome = data::run(&h.ctx, SessionMode::new(BuildMode::Development, phase));
        assert!(matches!(outcome, StepOutcome::Failed(ref m) if m.contains("list.json")));
        assert_eq!(h.notifier.errors(), vec![DATA_ERROR_MESSAGE.to_string()]);
    }
}

#[test]
fn success_is_only_announced_when_live() {
    let h = harness();
    h.file("src/data/a.json", r#"{"a": 1}"#);

    let initial = SessionMode::initial(BuildMode::Development);
    assert_eq!(data::run(&h.ctx, initial), StepOutcome::Success);
    assert!(h.notifier.messages().is_empty());

    let live = SessionMode::new(BuildMode::Development, SessionPhase::Live);
    assert_eq!(data::run(&h.ctx, live), StepOutcome::Success);
    assert_eq!(h.notifier.messages(), vec!["Data build completed.".to_string()]);
}
