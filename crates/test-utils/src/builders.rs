#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assetdag::config::{PipelineConfig, RawPipelineConfig, ToolSpec};
use assetdag::types::TriggerWhileRunningBehaviour;

/// Builder for `PipelineConfig` to simplify test setup.
///
/// Starts from the defaults (`src` → `website`, default tools) anchored at
/// `.`, which matches how `MockFileSystem` keys its paths.
pub struct ConfigBuilder {
    config: RawPipelineConfig,
    project_dir: PathBuf,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawPipelineConfig::default(),
            project_dir: PathBuf::from("."),
        }
    }

    pub fn project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn root(mut self, pattern: &str) -> Self {
        self.config.root.push(pattern.to_string());
        self
    }

    pub fn include_path(mut self, path: &str) -> Self {
        self.config.scss_include_paths.push(path.to_string());
        self
    }

    pub fn vendor(mut self, path: &str) -> Self {
        self.config.css_vendor.push(path.to_string());
        self
    }

    pub fn build_dir(mut self, dir: &str) -> Self {
        self.config.paths.build = dir.to_string();
        self
    }

    pub fn sass(mut self, spec: ToolSpec) -> Self {
        self.config.tools.sass = spec;
        self
    }

    pub fn postcss(mut self, spec: ToolSpec) -> Self {
        self.config.tools.postcss = spec;
        self
    }

    pub fn bundler(mut self, spec: ToolSpec) -> Self {
        self.config.tools.bundler = spec;
        self
    }

    pub fn lint(mut self, spec: ToolSpec) -> Self {
        self.config.tools.lint = spec;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn desktop_notifications(mut self, enabled: bool) -> Self {
        self.config.notifications.desktop = enabled;
        self
    }

    pub fn behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn queue_length(mut self, len: usize) -> Self {
        self.config.watch.queue_length = len;
        self
    }

    pub fn raw(&self) -> RawPipelineConfig {
        self.config.clone()
    }

    pub fn build(self) -> PipelineConfig {
        PipelineConfig::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_project_dir(self.project_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
