// src/steps/copy.rs

//! Templates and root files are copied verbatim.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, warn};

use super::{StepContext, StepOutcome};
use crate::fs::{relative_slash_path, walk_files};
use crate::types::SessionMode;
use crate::watch::{build_globset, compile_glob};

pub fn run_templates(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    finish(ctx, mode, copy_templates(ctx), "Template build completed.")
}

pub fn run_root_files(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    finish(ctx, mode, copy_root_files(ctx), "Root files build completed.")
}

fn finish(ctx: &StepContext, mode: SessionMode, result: Result<usize>, done: &str) -> StepOutcome {
    match result {
        Ok(copied) => {
            info!(copied, "{done}");
            ctx.reload_page(mode);
            ctx.notify_info(mode, done);
            StepOutcome::Success
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "copy failed");
            ctx.notify_error(format!("Error: {message}"));
            StepOutcome::Failed(message)
        }
    }
}

/// `src/templates/**/*.html` → `templates/`, keeping relative paths.
pub fn copy_templates(ctx: &StepContext) -> Result<usize> {
    let fs = ctx.fs.as_ref();
    let src = ctx.config.src_dir().join("templates");
    let dest = ctx.config.build_dir().join("templates");

    let mut copied = 0;
    for path in walk_files(fs, &src)? {
        let Some(rel) = relative_slash_path(&src, &path) else {
            continue;
        };
        if !rel.ends_with(".html") {
            continue;
        }
        fs.copy(&path, &dest.join(&rel))?;
        copied += 1;
    }
    Ok(copied)
}

/// Copy every file matching the `root` globs into the build directory,
/// relative to each glob's base. Patterns starting with `!` exclude.
pub fn copy_root_files(ctx: &StepContext) -> Result<usize> {
    let fs = ctx.fs.as_ref();
    let cfg = &ctx.config;
    let build_dir = cfg.build_dir();
    let build_rel = cfg.tool_path(&build_dir);

    let globs = cfg.root_globs();
    let exclude_set = build_globset(&globs.excludes)?;

    let mut copied = 0;
    for pattern in globs.includes.iter().map(String::as_str) {
        let matcher = compile_glob(pattern)?.compile_matcher();
        let base = glob_base(pattern);
        let walk_root: PathBuf = if base.is_empty() {
            cfg.project_dir().to_path_buf()
        } else {
            cfg.resolve(&base)
        };

        for path in walk_files(fs, &walk_root)? {
            let Some(rel) = relative_slash_path(cfg.project_dir(), &path) else {
                continue;
            };
            if rel.starts_with(&format!("{build_rel}/")) {
                continue;
            }
            if !matcher.is_match(&rel) || exclude_set.is_match(&rel) {
                continue;
            }

            let dest_rel = if base.is_empty() {
                rel.as_str()
            } else {
                rel.strip_prefix(&format!("{base}/")).unwrap_or(&rel)
            };
            debug!(from = %rel, to = %dest_rel, "copying root file");
            fs.copy(&path, &build_dir.join(dest_rel))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Literal directory prefix of a glob: the components before the first one
/// containing a wildcard. A pattern without wildcards names a file, so its
/// base is the parent directory.
pub fn glob_base(pattern: &str) -> String {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal_count = components
        .iter()
        .take_while(|c| !c.contains(['*', '?', '[', '{']))
        .count();

    let base = if literal_count == components.len() {
        &components[..components.len().saturating_sub(1)]
    } else {
        &components[..literal_count]
    };
    base.iter()
        .filter(|c| !c.is_empty() && **c != ".")
        .copied()
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::glob_base;

    #[test]
    fn glob_base_is_literal_prefix() {
        assert_eq!(glob_base("src/*.txt"), "src");
        assert_eq!(glob_base("src/root/**/*"), "src/root");
        assert_eq!(glob_base("src/favicon.ico"), "src");
        assert_eq!(glob_base("*.txt"), "");
        assert_eq!(glob_base("./src/{a,b}.txt"), "src");
    }
}
