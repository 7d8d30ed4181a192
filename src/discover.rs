// src/discover.rs

//! Find runnable scripts under a directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Collect every executable regular file below `dir`, sorted.
///
/// A missing or non-directory `dir` is not an error: it yields an empty list
/// and a warning. With `recursive = false` only direct children are
/// considered.
pub fn discover_scripts(fs: &dyn FileSystem, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    debug!(dir = ?dir, recursive, "discovering scripts");

    if !fs.exists(dir) {
        warn!(dir = ?dir, "script directory does not exist");
        return Ok(Vec::new());
    }
    if !fs.is_dir(dir) {
        warn!(dir = ?dir, "script path is not a directory");
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in fs.read_dir(&current)? {
            if fs.is_dir(&entry) {
                if recursive {
                    pending.push(entry);
                }
            } else if fs.is_file(&entry) && fs.is_executable(&entry) {
                debug!(path = ?entry, "found executable script");
                scripts.push(entry);
            }
        }
    }

    scripts.sort();
    info!(count = scripts.len(), "discovered executable scripts");
    Ok(scripts)
}
