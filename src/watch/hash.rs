// src/watch/hash.rs

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// blake3 hex digest of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Remembers the content hash of every file at the last accepted change.
///
/// Editors and `touch` produce events without content changes; those are
/// filtered out here so they do not rebuild anything.
#[derive(Debug, Default)]
pub struct ContentTracker {
    hashes: HashMap<PathBuf, String>,
}

impl ContentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `path` and report whether it differs
    /// from the last recorded content.
    ///
    /// Files that cannot be read (typically deleted) count as changed and
    /// are forgotten, so recreating them triggers again.
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        let hash = match compute_file_hash(fs, path) {
            Ok(h) => h,
            Err(err) => {
                debug!(?path, error = %err, "file not hashable; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.get(path) {
            Some(old) if *old == hash => {
                debug!(?path, "content unchanged");
                false
            }
            _ => {
                self.hashes.insert(path.to_path_buf(), hash);
                true
            }
        }
    }
}
