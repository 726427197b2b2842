// src/steps/data.rs

//! JSON data build.
//!
//! Fragments under `src/data/**/*.json` are validated, then deep-merged in
//! lexicographic order of their relative path into `data/data.json`. A
//! single invalid fragment blocks the write.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::{error, info};

use super::{StepContext, StepOutcome};
use crate::fs::{relative_slash_path, walk_files};
use crate::types::SessionMode;

/// Output file, relative to the build directory.
pub const DATA_OUTPUT: &str = "data/data.json";
pub const DATA_ERROR_MESSAGE: &str = "JSON data build error.";

pub fn run(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    match build(ctx) {
        Ok(DataBuild::Written { fragments }) => {
            info!(fragments, "data build finished");
            ctx.reload_page(mode);
            ctx.notify_info(mode, "Data build completed.");
            StepOutcome::Success
        }
        Ok(DataBuild::Invalid(errors)) => {
            for e in errors.iter() {
                error!("{e}");
            }
            ctx.notify_error(DATA_ERROR_MESSAGE);
            StepOutcome::Failed(errors.join("\n"))
        }
        Err(err) => {
            ctx.notify_error(DATA_ERROR_MESSAGE);
            StepOutcome::Failed(format!("{err:#}"))
        }
    }
}

/// Outcome of a data build that got as far as reading the fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum DataBuild {
    Written { fragments: usize },
    /// One `path:line:column: message` entry per problem; nothing written.
    Invalid(Vec<String>),
}

pub fn build(ctx: &StepContext) -> Result<DataBuild> {
    let fs = ctx.fs.as_ref();
    let cfg = &ctx.config;
    let data_dir = cfg.src_dir().join("data");

    let mut sources: Vec<(String, String)> = Vec::new();
    for path in walk_files(fs, &data_dir)? {
        let Some(rel) = relative_slash_path(&data_dir, &path) else {
            continue;
        };
        if !rel.ends_with(".json") {
            continue;
        }
        let label = cfg.tool_path(&path);
        sources.push((rel, label));
    }
    sources.sort_by(|a, b| a.0.cmp(&b.0));

    let mut fragments = Vec::with_capacity(sources.len());
    let mut errors = Vec::new();
    for (rel, label) in sources {
        let text = fs.read_to_string(&data_dir.join(&rel))?;
        match parse_fragment(&label, &text) {
            Ok(map) => fragments.push(map),
            Err(msg) => errors.push(msg),
        }
    }

    if !errors.is_empty() {
        return Ok(DataBuild::Invalid(errors));
    }

    let count = fragments.len();
    let merged = merge_fragments(fragments);
    let bytes = serde_json::to_vec(&Value::Object(merged))?;
    fs.write(&cfg.build_dir().join(DATA_OUTPUT), &bytes)?;

    Ok(DataBuild::Written { fragments: count })
}

/// Parse one fragment; it must be a JSON object.
///
/// Errors are formatted as `label:line:column: message`.
pub fn parse_fragment(label: &str, text: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "{label}:1:1: top-level value must be an object, found {}",
            json_kind(&other)
        )),
        Err(err) => {
            let full = err.to_string();
            let suffix = format!(" at line {} column {}", err.line(), err.column());
            let message = full.strip_suffix(&suffix).unwrap_or(&full);
            Err(format!("{label}:{}:{}: {message}", err.line(), err.column()))
        }
    }
}

/// Deep-merge fragments in order; later fragments win.
pub fn merge_fragments(fragments: impl IntoIterator<Item = Map<String, Value>>) -> Map<String, Value> {
    let mut merged = Map::new();
    for fragment in fragments {
        merge_into(&mut merged, fragment);
    }
    merged
}

/// Objects merge key by key, recursively. Any other value, arrays
/// included, replaces what was there.
pub fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        let incoming = match value {
            Value::Object(incoming) => incoming,
            other => {
                target.insert(key, other);
                continue;
            }
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            merge_into(existing, incoming);
            continue;
        }
        target.insert(key, Value::Object(incoming));
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn nested_objects_merge_and_arrays_replace() {
        let merged = merge_fragments([
            obj(json!({"site": {"title": "A", "tags": [1, 2]}, "x": 1})),
            obj(json!({"site": {"lang": "en", "tags": [3]}})),
        ]);
        assert_eq!(
            Value::Object(merged),
            json!({"site": {"title": "A", "tags": [3], "lang": "en"}, "x": 1})
        );
    }

    #[test]
    fn parse_errors_carry_position() {
        let err = parse_fragment("src/data/bad.json", "{\n  \"a\": 1,\n}").unwrap_err();
        assert!(err.starts_with("src/data/bad.json:3:1: "), "{err}");
        assert!(!err.contains(" at line "), "{err}");
    }

    #[test]
    fn non_object_fragments_are_rejected() {
        let err = parse_fragment("src/data/list.json", "[1, 2]").unwrap_err();
        assert!(err.contains("an array"), "{err}");
    }
}
