// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod notifications;
pub mod server;
pub mod steps;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{PipelineConfig, load_and_validate};
use crate::dag::{PipelinePlan, TaskCatalog};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, TriggerReason};
use crate::exec::{ProcessToolRunner, StepExecutor};
use crate::fs::RealFileSystem;
use crate::notifications::NotificationSink;
use crate::server::ReloadHub;
use crate::steps::StepContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the `--port` override
/// - compiling the requested entry point into a plan
/// - the step context (filesystem, tools, notifications, live reload)
/// - core runtime / executor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config_path();
    let mut cfg = load_and_validate(&config_path)?;
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    let entry = args.entry();
    let plan = TaskCatalog::standard().compile(entry.target())?;

    if args.dry_run {
        print_dry_run(&cfg, &plan);
        return Ok(());
    }

    let build_mode = args.build_mode();
    info!(entry = entry.target(), mode = %build_mode, "starting pipeline");

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let behaviour = cfg.watch.triggered_while_running_behaviour;
    let queue_length = cfg.watch.queue_length;
    let desktop = cfg.notifications.desktop;

    let ctx = StepContext::new(
        Arc::new(cfg),
        Arc::new(RealFileSystem),
        Arc::new(ProcessToolRunner),
        Arc::new(NotificationSink::standard(desktop)),
    )
    .with_reload(ReloadHub::default())
    .with_runtime_events(rt_tx.clone());

    let executor = StepExecutor::new(Arc::new(ctx), rt_tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    rt_tx
        .send(RuntimeEvent::TaskTriggered {
            task: plan.target().to_string(),
            reason: TriggerReason::EntryPoint,
        })
        .await?;

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(&plan, build_mode, behaviour, queue_length);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, executor);
    runtime.run().await?;
    Ok(())
}

/// Simple dry-run output: print the resolved config and the plan's layers.
fn print_dry_run(cfg: &PipelineConfig, plan: &PipelinePlan) {
    println!("assetdag dry-run: {}", plan.target());
    println!("  project = {}", cfg.project_dir().display());
    println!("  src = {}", cfg.tool_path(&cfg.src_dir()));
    println!("  build = {}", cfg.tool_path(&cfg.build_dir()));
    println!("  server = {}:{}", cfg.server.host, cfg.server.port);
    println!("  watching = {}", plan.continues_watching());
    println!();

    for (depth, layer) in plan.layers().iter().enumerate() {
        println!("layer {depth}:");
        for name in layer {
            match plan.task(name) {
                Some(task) if !task.deps.is_empty() => {
                    println!("  - {name} ({:?}) after {:?}", task.def.step, task.deps);
                }
                Some(task) => println!("  - {name} ({:?})", task.def.step),
                None => println!("  - {name}"),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
