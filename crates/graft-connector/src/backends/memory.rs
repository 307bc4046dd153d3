//! In-memory filesystem backend.
//!
//! Used for tests and the CLI. All data is ephemeral.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use graft_types::{DirEntry, FileAttr, FileType};

use crate::backend::NodeFileSystem;
use crate::connector::FileSystemConnector;
use crate::error::{ConnectorError, ConnectorResult};

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { attr: FileAttr },
    Directory { attr: FileAttr },
    Symlink { target: PathBuf, attr: FileAttr },
}

impl Entry {
    fn attr(&self) -> &FileAttr {
        match self {
            Entry::File { attr } => attr,
            Entry::Directory { attr } => attr,
            Entry::Symlink { attr, .. } => attr,
        }
    }

    fn kind(&self) -> FileType {
        self.attr().kind
    }
}

/// In-memory filesystem backend.
///
/// Holds attributes only; there is no file content. Counts its mount
/// hooks so callers can check the lifecycle.
#[derive(Debug)]
pub struct MemoryFileSystem {
    name: String,
    entries: RwLock<HashMap<PathBuf, Entry>>,
    mounted: AtomicUsize,
    unmounted: AtomicUsize,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new("memfs")
    }
}

impl MemoryFileSystem {
    /// Create an empty filesystem.
    pub fn new(name: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::new(),
            Entry::Directory {
                attr: FileAttr::directory(0o755),
            },
        );
        Self {
            name: name.into(),
            entries: RwLock::new(entries),
            mounted: AtomicUsize::new(0),
            unmounted: AtomicUsize::new(0),
        }
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    fn insert(&self, path: &Path, entry: Entry) -> ConnectorResult<()> {
        let path = Self::normalize(path);
        if path.as_os_str().is_empty() {
            return Err(ConnectorError::already_exists("/"));
        }
        let mut entries = self.entries.write();
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            current.push(component);
            let parent = entries.entry(current.clone()).or_insert(Entry::Directory {
                attr: FileAttr::directory(0o755),
            });
            if !parent.kind().is_dir() {
                return Err(ConnectorError::not_a_directory(current.display().to_string()));
            }
        }
        entries.insert(path, entry);
        Ok(())
    }

    /// Create a directory and any missing parents.
    pub fn mkdir_all(&self, path: impl AsRef<Path>) -> ConnectorResult<()> {
        let path = Self::normalize(path.as_ref());
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.entries.read().get(&path) {
            return if existing.kind().is_dir() {
                Ok(())
            } else {
                Err(ConnectorError::already_exists(path.display().to_string()))
            };
        }
        self.insert(
            &path,
            Entry::Directory {
                attr: FileAttr::directory(0o755),
            },
        )
    }

    /// Create (or replace) a regular file of `size` bytes.
    pub fn add_file(&self, path: impl AsRef<Path>, size: u64) -> ConnectorResult<()> {
        self.insert(
            path.as_ref(),
            Entry::File {
                attr: FileAttr::file(size, 0o644),
            },
        )
    }

    /// Create a symlink.
    pub fn add_symlink(&self, path: impl AsRef<Path>, target: impl Into<PathBuf>) -> ConnectorResult<()> {
        let target = target.into();
        let attr = FileAttr::symlink(target.as_os_str().len() as u64);
        self.insert(path.as_ref(), Entry::Symlink { target, attr })
    }

    /// Remove a file, symlink or empty directory.
    pub fn remove(&self, path: impl AsRef<Path>) -> ConnectorResult<()> {
        let path = Self::normalize(path.as_ref());
        if path.as_os_str().is_empty() {
            return Err(ConnectorError::invalid("cannot remove the root"));
        }
        let mut entries = self.entries.write();
        if entries.keys().any(|p| p.parent() == Some(path.as_path()) && *p != path) {
            return Err(ConnectorError::busy(format!("{} is not empty", path.display())));
        }
        entries
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| ConnectorError::not_found(path.display().to_string()))
    }

    /// Target of a symlink.
    pub fn readlink(&self, path: impl AsRef<Path>) -> ConnectorResult<PathBuf> {
        let path = Self::normalize(path.as_ref());
        match self.entries.read().get(&path) {
            Some(Entry::Symlink { target, .. }) => Ok(target.clone()),
            Some(_) => Err(ConnectorError::invalid(format!("{} is not a symlink", path.display()))),
            None => Err(ConnectorError::not_found(path.display().to_string())),
        }
    }

    /// How many times the backend has been mounted.
    pub fn mount_count(&self) -> usize {
        self.mounted.load(Ordering::SeqCst)
    }

    /// How many times the backend has been unmounted.
    pub fn unmount_count(&self) -> usize {
        self.unmounted.load(Ordering::SeqCst)
    }
}

impl NodeFileSystem for MemoryFileSystem {
    fn on_mount(&self, _connector: &FileSystemConnector) {
        self.mounted.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(backend = %self.name, "memory filesystem mounted");
    }

    fn on_unmount(&self) {
        self.unmounted.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(backend = %self.name, "memory filesystem unmounted");
    }

    fn getattr(&self, path: &Path) -> ConnectorResult<FileAttr> {
        let normalized = Self::normalize(path);
        self.entries
            .read()
            .get(&normalized)
            .map(|e| e.attr().clone())
            .ok_or_else(|| ConnectorError::not_found(normalized.display().to_string()))
    }

    fn readdir(&self, path: &Path) -> ConnectorResult<Vec<DirEntry>> {
        let normalized = Self::normalize(path);
        let entries = self.entries.read();

        match entries.get(&normalized) {
            Some(Entry::Directory { .. }) => {}
            Some(_) => {
                return Err(ConnectorError::not_a_directory(normalized.display().to_string()));
            }
            None => return Err(ConnectorError::not_found(normalized.display().to_string())),
        }

        let mut result: Vec<DirEntry> = entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(normalized.as_path()) && **p != normalized)
            .filter_map(|(p, entry)| {
                let name = p.file_name()?;
                Some(DirEntry::new(name.to_string_lossy(), entry.kind()))
            })
            .collect();

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
