// src/steps/css.rs

//! Sass pipeline: glob imports, `sass`, then the CSS post-processor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use super::{StepContext, StepOutcome};
use crate::exec::tool::ToolInvocation;
use crate::fs::{relative_slash_path, walk_files};
use crate::steps::sassglob::expand_glob_imports;
use crate::types::{BuildMode, SessionMode};

pub async fn run(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    match build_all(ctx, mode.build).await {
        Ok(count) => {
            info!(entries = count, "css build finished");
            ctx.inject_css(mode);
            ctx.notify_info(mode, "CSS build completed.");
            StepOutcome::Success
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "css build failed");
            ctx.notify_error(format!("Error: {message}"));
            StepOutcome::Failed(message)
        }
    }
}

/// Non-partial `.scss` files below `scss_dir`, sorted.
pub fn entry_files(ctx: &StepContext, scss_dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(walk_files(ctx.fs.as_ref(), scss_dir)?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "scss"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('_'))
        })
        .collect())
}

async fn build_all(ctx: &StepContext, build: BuildMode) -> Result<usize> {
    let scss_dir = ctx.config.src_dir().join("scss");
    let out_dir = ctx.config.build_dir().join("css");

    let entries = entry_files(ctx, &scss_dir)?;
    for entry in entries.iter() {
        let rel = relative_slash_path(&scss_dir, entry)
            .with_context(|| format!("{:?} is outside {:?}", entry, scss_dir))?;
        let output = out_dir.join(format!("{}.css", rel.trim_end_matches(".scss")));
        compile_entry(ctx, build, entry, &output).await?;
    }
    Ok(entries.len())
}

async fn compile_entry(
    ctx: &StepContext,
    build: BuildMode,
    entry: &Path,
    output: &Path,
) -> Result<()> {
    let fs = ctx.fs.as_ref();
    let source = fs.read_to_string(entry)?;
    let expanded = expand_glob_imports(fs, entry, &source)?;

    if let Some(parent) = output.parent() {
        fs.create_dir_all(parent)?;
    }

    let sass = sass_invocation(ctx, build, entry, output).stdin(expanded);
    let out = ctx.tools.run(sass).await.context("running sass")?;
    if !out.is_success() {
        bail!("{}: {}", entry.display(), out.diagnostics());
    }

    let postcss = postcss_invocation(ctx, build, output);
    let out = ctx.tools.run(postcss).await.context("running postcss")?;
    if !out.is_success() {
        bail!("{}: {}", output.display(), out.diagnostics());
    }

    Ok(())
}

/// `sass --stdin` with load paths for the entry's directory and every
/// configured include path, writing to `output`.
pub fn sass_invocation(
    ctx: &StepContext,
    build: BuildMode,
    entry: &Path,
    output: &Path,
) -> ToolInvocation {
    let cfg = &ctx.config;
    let entry_dir = entry.parent().unwrap_or_else(|| Path::new("."));

    let mut invocation = ToolInvocation::from_spec(&cfg.tools.sass, build, cfg.project_dir())
        .arg("--stdin")
        .arg(format!("--load-path={}", cfg.tool_path(entry_dir)));
    for include in cfg.scss_include_paths.iter() {
        invocation = invocation.arg(format!("--load-path={include}"));
    }
    if !build.source_maps() {
        invocation = invocation.arg("--no-source-map");
    }
    invocation.arg(cfg.tool_path(output))
}

/// Post-process `file` in place. Minification plugins come from the
/// production arguments of the configured tool.
pub fn postcss_invocation(ctx: &StepContext, build: BuildMode, file: &Path) -> ToolInvocation {
    let cfg = &ctx.config;
    ToolInvocation::from_spec(&cfg.tools.postcss, build, cfg.project_dir())
        .arg("--replace")
        .arg(cfg.tool_path(file))
        .arg(if build.source_maps() { "--map" } else { "--no-map" })
}
