// src/steps/services.rs

//! Steps that start long-lived services for a watch session.

use anyhow::{Context, Result, anyhow};
use tracing::info;

use super::StepContext;
use crate::server;
use crate::watch::{build_task_watch_profiles, spawn_watcher, standard_rules};

/// Register the watch rules. Running it again is a no-op.
pub fn install_watch(ctx: &StepContext) -> Result<()> {
    let mut services = ctx.services_guard();
    if services.watcher.is_some() {
        return Ok(());
    }

    let tx = ctx
        .runtime_tx
        .clone()
        .ok_or_else(|| anyhow!("install-watch needs a runtime event channel"))?;

    let rules = standard_rules(&ctx.config);
    let profiles = build_task_watch_profiles(&rules)?;
    let handle = spawn_watcher(
        ctx.config.project_dir(),
        &ctx.config.paths.build,
        profiles,
        ctx.fs.clone(),
        tx,
    )?;

    info!(rules = rules.len(), "watch rules installed");
    services.watcher = Some(handle);
    Ok(())
}

/// Start the dev server on the configured address. Running it again is a
/// no-op.
pub async fn start_dev_server(ctx: &StepContext) -> Result<()> {
    if ctx.is_serving() {
        return Ok(());
    }

    let cfg = &ctx.config;
    let running = server::start(
        &cfg.server.host,
        cfg.server.port,
        cfg.build_dir(),
        ctx.reload.clone(),
    )
    .await
    .context("starting dev server")?;

    info!(addr = %running.local_addr(), "serving {}", cfg.build_dir().display());
    ctx.services_guard().server = Some(running);
    Ok(())
}
