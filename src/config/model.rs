// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{BuildMode, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from `config.json` (or a `.toml` file).
///
/// ```json
/// {
///   "root": ["src/index.html", "src/favicon.ico"],
///   "scssIncludePaths": ["node_modules"],
///   "cssVendor": ["node_modules/normalize.css/normalize.css"],
///   "server": { "port": 3000 }
/// }
/// ```
///
/// Only the three asset lists are part of the classic schema; every other
/// section is optional and has defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPipelineConfig {
    /// Globs of files copied verbatim into the build root.
    #[serde(default)]
    pub root: Vec<String>,

    /// Extra Sass load paths.
    #[serde(default, rename = "scssIncludePaths", alias = "scss_include_paths")]
    pub scss_include_paths: Vec<String>,

    /// Ordered list of vendor stylesheets concatenated into `vendor.css`.
    #[serde(default, rename = "cssVendor", alias = "css_vendor")]
    pub css_vendor: Vec<String>,

    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub notifications: NotificationsSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawPipelineConfig>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub root: Vec<String>,
    pub scss_include_paths: Vec<String>,
    pub css_vendor: Vec<String>,
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub server: ServerSection,
    pub notifications: NotificationsSection,
    pub watch: WatchSection,
    /// Directory every relative path is resolved against.
    project_dir: PathBuf,
}

impl PipelineConfig {
    pub(crate) fn new_unchecked(raw: RawPipelineConfig) -> Self {
        Self {
            root: raw.root,
            scss_include_paths: raw.scss_include_paths,
            css_vendor: raw.css_vendor,
            paths: raw.paths,
            tools: raw.tools,
            server: raw.server,
            notifications: raw.notifications,
            watch: raw.watch,
            project_dir: PathBuf::from("."),
        }
    }

    /// Anchor all relative paths at `dir` (normally the config file's
    /// directory).
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = dir.into();
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Resolve a project-relative path.
    pub fn resolve(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.project_dir.join(rel)
    }

    /// Absolute-ish source directory (`<project>/src`).
    pub fn src_dir(&self) -> PathBuf {
        self.resolve(&self.paths.src)
    }

    /// Build output directory (`<project>/website`).
    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.paths.build)
    }

    /// `path` as seen from the project directory, which is the working
    /// directory of every external tool.
    pub fn tool_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.project_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// The `root` globs split into includes and `!` excludes, relative to
    /// the project with any leading `./` removed.
    pub fn root_globs(&self) -> RootGlobs {
        let mut globs = RootGlobs::default();
        for pattern in &self.root {
            match pattern.strip_prefix('!') {
                Some(excluded) => globs.excludes.push(normalize_glob(excluded)),
                None => globs.includes.push(normalize_glob(pattern)),
            }
        }
        globs
    }

    /// Source directory relative to the project, with forward slashes, for
    /// use in glob patterns.
    pub fn src_glob_prefix(&self) -> String {
        self.paths.src.trim_end_matches('/').replace('\\', "/")
    }
}

/// Normalised `root` globs, see [`PipelineConfig::root_globs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootGlobs {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

fn normalize_glob(pattern: &str) -> String {
    let mut pattern = pattern.trim();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest;
    }
    pattern.to_string()
}

/// `paths` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: String,
    #[serde(default = "default_build")]
    pub build: String,
}

fn default_src() -> String {
    "src".to_string()
}

fn default_build() -> String {
    "website".to_string()
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            build: default_build(),
        }
    }
}

/// One external tool invocation.
///
/// The effective command line is `program args... <mode args>...`, followed
/// by whatever arguments the step itself adds (input/output paths, source map
/// switches).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub development_args: Vec<String>,
    #[serde(default)]
    pub production_args: Vec<String>,
}

impl ToolSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            development_args: Vec::new(),
            production_args: Vec::new(),
        }
    }

    pub fn with_development_args(mut self, args: &[&str]) -> Self {
        self.development_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_production_args(mut self, args: &[&str]) -> Self {
        self.production_args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Base arguments plus the ones specific to `mode`.
    pub fn args_for(&self, mode: BuildMode) -> Vec<String> {
        let mut args = self.args.clone();
        match mode {
            BuildMode::Development => args.extend(self.development_args.iter().cloned()),
            BuildMode::Production => args.extend(self.production_args.iter().cloned()),
        }
        args
    }
}

/// `tools` section: the external compilers the steps delegate to.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_sass")]
    pub sass: ToolSpec,
    #[serde(default = "default_postcss")]
    pub postcss: ToolSpec,
    #[serde(default = "default_bundler")]
    pub bundler: ToolSpec,
    #[serde(default = "default_lint")]
    pub lint: ToolSpec,
    #[serde(default)]
    pub bundler_watch: BundlerWatchSpec,
}

/// How `js-watch` keeps the bundler running.
///
/// The bundler is started with its usual arguments plus `args` and left
/// running. Every output line matching `pass_pattern` ends one compilation
/// pass; the pass failed when that line also matches `error_pattern`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BundlerWatchSpec {
    #[serde(default = "default_watch_args")]
    pub args: Vec<String>,
    #[serde(default = "default_pass_pattern")]
    pub pass_pattern: String,
    #[serde(default = "default_error_pattern")]
    pub error_pattern: String,
}

fn default_watch_args() -> Vec<String> {
    vec!["--watch".to_string()]
}

fn default_pass_pattern() -> String {
    r"\bcompiled\b".to_string()
}

fn default_error_pattern() -> String {
    r"\berrors?\b".to_string()
}

impl Default for BundlerWatchSpec {
    fn default() -> Self {
        Self {
            args: default_watch_args(),
            pass_pattern: default_pass_pattern(),
            error_pattern: default_error_pattern(),
        }
    }
}

fn default_sass() -> ToolSpec {
    ToolSpec::new("sass", &[])
}

fn default_postcss() -> ToolSpec {
    ToolSpec::new("npx", &["postcss", "--use", "postcss-assets", "--use", "autoprefixer"])
        .with_production_args(&["--use", "cssnano"])
}

fn default_bundler() -> ToolSpec {
    ToolSpec::new("npx", &["webpack", "--config", "webpack.config.js"])
        .with_development_args(&["--mode", "development", "--devtool", "cheap-module-source-map"])
        .with_production_args(&["--mode", "production", "--no-devtool"])
}

fn default_lint() -> ToolSpec {
    ToolSpec::new("npx", &["eslint", "src/js"])
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            sass: default_sass(),
            postcss: default_postcss(),
            bundler: default_bundler(),
            lint: default_lint(),
            bundler_watch: BundlerWatchSpec::default(),
        }
    }
}

/// `server` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `notifications` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsSection {
    /// Also raise desktop notifications (`notify-send` / `osascript`).
    #[serde(default = "default_true")]
    pub desktop: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NotificationsSection {
    fn default() -> Self {
        Self { desktop: true }
    }
}

/// `watch` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// `"queue"` (default) or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued follow-up runs.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}
