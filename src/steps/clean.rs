// src/steps/clean.rs

use anyhow::Result;
use tracing::{debug, info};

use super::StepContext;
use crate::fs::{relative_slash_path, walk_files};
use crate::watch::build_globset;

/// Files removed from the build directory, relative to it.
const CLEAN_FILE_PATTERNS: [&str; 4] = [
    "css/*.*",
    "css/assets/*.*",
    "css/vendor/*.css",
    "css/vendor/*.map",
];

/// Directories removed entirely.
const CLEAN_DIRS: [&str; 2] = ["templates", "js"];

/// Remove previous outputs. Everything else in the build directory (root
/// files, `data/`, other assets) is left alone.
///
/// Returns how many files and directories were removed.
pub fn run(ctx: &StepContext) -> Result<usize> {
    let fs = ctx.fs.as_ref();
    let build_dir = ctx.config.build_dir();
    let patterns: Vec<String> = CLEAN_FILE_PATTERNS.iter().map(|p| p.to_string()).collect();
    let matcher = build_globset(&patterns)?;

    let mut removed = 0;
    for path in walk_files(fs, &build_dir)? {
        let Some(rel) = relative_slash_path(&build_dir, &path) else {
            continue;
        };
        if matcher.is_match(&rel) {
            debug!(path = %rel, "removing");
            fs.remove_file(&path)?;
            removed += 1;
        }
    }

    for dir in CLEAN_DIRS {
        let path = build_dir.join(dir);
        if fs.is_dir(&path) {
            debug!(path = %dir, "removing directory");
            fs.remove_dir_all(&path)?;
            removed += 1;
        }
    }

    info!(removed, build_dir = %build_dir.display(), "cleaned build outputs");
    Ok(removed)
}
