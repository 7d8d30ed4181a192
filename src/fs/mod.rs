// src/fs/mod.rs

//! Filesystem seam for script discovery.
//!
//! [`RealFileSystem`] reads the host filesystem; [`mock::MockFileSystem`]
//! keeps a tree in memory for tests.

use std::fmt::Debug;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// Owner execute bit.
const OWNER_EXEC: u32 = 0o100;

/// The filesystem queries discovery needs.
pub trait FileSystem: Send + Sync + Debug {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Regular file with the owner execute bit set.
    fn is_executable(&self, path: &Path) -> bool;

    /// Full paths of the entries directly inside `path`, in no particular
    /// order.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_executable(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.is_file() && meta.permissions().mode() & OWNER_EXEC != 0)
            .unwrap_or(false)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::read_dir(path)
            .with_context(|| format!("listing script directory {}", path.display()))?
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .with_context(|| format!("reading entry of {}", path.display()))
            })
            .collect()
    }
}
