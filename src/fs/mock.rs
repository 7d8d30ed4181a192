// src/fs/mock.rs

//! In-memory [`FileSystem`] for discovery tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};

use super::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEntry {
    File { executable: bool },
    Dir,
}

/// Paths are stored as given; directories are implied by the files added
/// under them, rooted at `"."`.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.entries().insert(PathBuf::from("."), MockEntry::Dir);
        fs
    }

    /// Add a regular file along with any missing parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, executable: bool) {
        let path = path.as_ref();
        let mut entries = self.entries();
        add_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File { executable });
    }

    /// Add an empty directory along with any missing parents.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut entries = self.entries();
        add_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Dir);
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn entry(&self, path: &Path) -> Option<MockEntry> {
        self.entries().get(path).copied()
    }
}

fn add_parents(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        entries.entry(ancestor.to_path_buf()).or_insert(MockEntry::Dir);
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.entry(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry(path), Some(MockEntry::Dir))
    }

    fn is_executable(&self, path: &Path) -> bool {
        self.entry(path) == Some(MockEntry::File { executable: true })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            bail!("not a directory: {}", path.display());
        }

        // Top-level relative paths have an empty parent; they live in ".".
        let is_child = |candidate: &Path| match candidate.parent() {
            Some(parent) if parent.as_os_str().is_empty() => path == Path::new("."),
            Some(parent) => parent == path,
            None => false,
        };

        Ok(self
            .entries()
            .keys()
            .filter(|candidate| candidate.as_path() != path && is_child(candidate))
            .cloned()
            .collect())
    }
}
