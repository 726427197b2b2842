// src/steps/vendor.rs

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use super::{StepContext, StepOutcome};
use crate::steps::css::postcss_invocation;
use crate::types::{BuildMode, SessionMode};

/// Output file, relative to the build directory.
pub const VENDOR_BUNDLE: &str = "css/vendor/vendor.css";

/// Concatenate `cssVendor` in order into one stylesheet and post-process it.
pub async fn run(ctx: &StepContext, mode: SessionMode) -> StepOutcome {
    match build(ctx, mode.build).await {
        Ok(()) => {
            ctx.inject_css(mode);
            ctx.notify_info(mode, "Vendor CSS build completed.");
            StepOutcome::Success
        }
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "vendor css build failed");
            ctx.notify_error(format!("Error: {message}"));
            StepOutcome::Failed(message)
        }
    }
}

async fn build(ctx: &StepContext, build: BuildMode) -> Result<()> {
    let fs = ctx.fs.as_ref();
    let cfg = &ctx.config;

    let mut bundle = String::new();
    for source in cfg.css_vendor.iter() {
        let path = cfg.resolve(source);
        let css = fs
            .read_to_string(&path)
            .with_context(|| format!("reading vendor stylesheet {source}"))?;
        bundle.push_str(&css);
        if !bundle.ends_with('\n') {
            bundle.push('\n');
        }
    }

    let output = cfg.build_dir().join(VENDOR_BUNDLE);
    fs.write(&output, bundle.as_bytes())?;
    info!(files = cfg.css_vendor.len(), "vendor css concatenated");

    let out = ctx
        .tools
        .run(postcss_invocation(ctx, build, &output))
        .await
        .context("running postcss")?;
    if !out.is_success() {
        bail!("{}: {}", output.display(), out.diagnostics());
    }
    Ok(())
}
