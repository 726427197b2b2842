//! Fakes and builders shared by the `assetdag` integration tests.

pub mod builders;
pub mod fake_executor;
pub mod fake_tools;
pub mod notifier;

use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Once};
use std::time::Duration;

use assetdag::config::PipelineConfig;
use assetdag::fs::mock::MockFileSystem;
use assetdag::steps::StepContext;
use tracing_subscriber::EnvFilter;

pub use builders::ConfigBuilder;
pub use fake_executor::{FakeExecutor, executed_names};
pub use fake_tools::{FakeToolRunner, ToolReply};
pub use notifier::RecordingNotifier;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so it only shows for
/// failing tests. `RUST_LOG` picks the filter; the default is `info`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Fail the test if `f` has not finished within five seconds.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .expect("test timed out after 5 seconds")
}

/// A step context backed entirely by fakes.
pub struct StepHarness {
    pub ctx: StepContext,
    pub fs: Arc<MockFileSystem>,
    pub tools: FakeToolRunner,
    pub notifier: RecordingNotifier,
}

impl StepHarness {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_tools(config, FakeToolRunner::new())
    }

    pub fn with_tools(config: PipelineConfig, tools: FakeToolRunner) -> Self {
        let fs = Arc::new(MockFileSystem::new());
        let notifier = RecordingNotifier::new();
        let ctx = StepContext::new(
            Arc::new(config),
            fs.clone(),
            Arc::new(tools.clone()),
            Arc::new(notifier.clone()),
        );
        Self {
            ctx,
            fs,
            tools,
            notifier,
        }
    }

    /// Add a file relative to the project directory.
    pub fn file(&self, rel: impl AsRef<Path>, content: &str) {
        let path = self.ctx.config.resolve(rel);
        self.fs.add_file(path, content);
    }

    /// Contents of a file relative to the project directory.
    pub fn read(&self, rel: impl AsRef<Path>) -> Option<String> {
        self.fs.contents(self.ctx.config.resolve(rel))
    }
}
