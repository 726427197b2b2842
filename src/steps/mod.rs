// src/steps/mod.rs

//! Build steps.
//!
//! Each [`StepKind`] maps to one async function here. Steps receive the
//! shared [`StepContext`] plus the [`SessionMode`] stamped on their
//! dispatch, and report a [`StepOutcome`]. Internally they use `anyhow`
//! with context; errors are converted to outcomes at this boundary.

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::dag::{ScheduledTask, StepKind};
use crate::engine::RuntimeEvent;
use crate::exec::tool::ToolRunner;
use crate::fs::FileSystem;
use crate::notifications::{Notification, Notifier};
use crate::server::{DevServer, ReloadHub};
use crate::types::SessionMode;
use crate::watch::WatcherHandle;

pub mod clean;
pub mod copy;
pub mod css;
pub mod data;
pub mod js;
pub mod sassglob;
pub mod services;
pub mod vendor;

/// What a step reports back to the scheduler.
pub use crate::engine::TaskOutcome as StepOutcome;

/// Everything a step may touch.
pub struct StepContext {
    pub config: Arc<PipelineConfig>,
    pub fs: Arc<dyn FileSystem>,
    pub tools: Arc<dyn ToolRunner>,
    pub notifier: Arc<dyn Notifier>,
    pub reload: ReloadHub,
    runtime_tx: Option<mpsc::Sender<RuntimeEvent>>,
    services: Mutex<Services>,
}

/// Long-lived handles started by `install-watch`, `dev-server` and
/// `js-watch`.
#[derive(Debug, Default)]
struct Services {
    watcher: Option<WatcherHandle>,
    server: Option<DevServer>,
    bundler: Option<Arc<js::BundlerSession>>,
}

impl fmt::Debug for StepContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("config", &self.config)
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl StepContext {
    pub fn new(
        config: Arc<PipelineConfig>,
        fs: Arc<dyn FileSystem>,
        tools: Arc<dyn ToolRunner>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            fs,
            tools,
            notifier,
            reload: ReloadHub::default(),
            runtime_tx: None,
            services: Mutex::new(Services::default()),
        }
    }

    pub fn with_reload(mut self, reload: ReloadHub) -> Self {
        self.reload = reload;
        self
    }

    /// Channel the file watcher feeds; required by `install-watch`.
    pub fn with_runtime_events(mut self, tx: mpsc::Sender<RuntimeEvent>) -> Self {
        self.runtime_tx = Some(tx);
        self
    }

    /// Completion message, shown only once the session is live.
    pub fn notify_info(&self, mode: SessionMode, message: &str) {
        if mode.notifications_enabled() {
            self.notifier.notify(&Notification::info(message));
        } else {
            debug!(message, "notification suppressed during initial build");
        }
    }

    /// Error message, shown in every phase.
    pub fn notify_error(&self, message: impl Into<String>) {
        self.notifier.notify(&Notification::error(message));
    }

    pub fn reload_page(&self, mode: SessionMode) {
        if mode.live_reload_enabled() {
            self.reload.reload();
        }
    }

    pub fn inject_css(&self, mode: SessionMode) {
        if mode.live_reload_enabled() {
            self.reload.inject_css();
        }
    }

    pub fn is_watching(&self) -> bool {
        self.services_guard().watcher.is_some()
    }

    pub fn is_serving(&self) -> bool {
        self.services_guard().server.is_some()
    }

    pub fn bundler_session(&self) -> Option<Arc<js::BundlerSession>> {
        self.services_guard().bundler.clone()
    }

    fn services_guard(&self) -> std::sync::MutexGuard<'_, Services> {
        self.services.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Run the step behind `task` to completion.
pub async fn run_step(ctx: &StepContext, task: &ScheduledTask) -> StepOutcome {
    let mode = task.session;
    info!(
        task = %task.name,
        run_id = task.run_id,
        build = %mode.build,
        phase = ?mode.phase,
        "running step"
    );

    match task.step {
        StepKind::Clean => into_outcome(clean::run(ctx)),
        StepKind::JsBuild => js::run(ctx, mode).await,
        StepKind::JsWatch => js::run_watch(ctx, mode, &task.name).await,
        StepKind::CssBuild => css::run(ctx, mode).await,
        StepKind::CssVendorBuild => vendor::run(ctx, mode).await,
        StepKind::TemplatesBuild => copy::run_templates(ctx, mode),
        StepKind::RootFilesBuild => copy::run_root_files(ctx, mode),
        StepKind::DataBuild => data::run(ctx, mode),
        StepKind::BuildNotify => {
            ctx.notifier.notify(&Notification::info("Build completed."));
            StepOutcome::Success
        }
        StepKind::InstallWatch => into_outcome(services::install_watch(ctx)),
        StepKind::DevServer => into_outcome(services::start_dev_server(ctx).await),
        StepKind::EntryPoint => StepOutcome::Success,
    }
}

/// `Ok` becomes success, `Err` a (non-fatal) failure with the full chain.
pub fn into_outcome<T>(result: anyhow::Result<T>) -> StepOutcome {
    match result {
        Ok(_) => StepOutcome::Success,
        Err(err) => StepOutcome::Failed(format!("{err:#}")),
    }
}
