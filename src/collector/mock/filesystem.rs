//! In-memory mock filesystem for testing collectors without real `/proc`.
//!
//! This module provides `MockFs` which simulates a filesystem in memory,
//! allowing tests to run on macOS and in CI environments without Linux.

use crate::collector::traits::FileSystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Stores files, directories and symlinks in memory, allowing tests to
/// simulate various `/proc` and `/sys/block` states without Linux access.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
    /// Map from link path to its (unresolved) target.
    symlinks: HashMap<PathBuf, PathBuf>,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content.
    ///
    /// Parent directories are automatically created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Adds a symlink pointing at `target`. The target is stored verbatim
    /// and never resolved, like `readlink(2)`.
    pub fn add_symlink(&mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.symlinks.insert(path, target.as_ref().to_path_buf());
    }

    /// Registers a `/sys/block/<name>` entry.
    ///
    /// Physical devices link into the PCI tree, virtual ones into
    /// `devices/virtual/block`.
    pub fn add_block_device(&mut self, sys_path: impl AsRef<Path>, name: &str, physical: bool) {
        let target = if physical {
            format!("../devices/pci0000:00/0000:00:04.0/virtio1/block/{}", name)
        } else {
            format!("../devices/virtual/block/{}", name)
        };
        self.add_symlink(sys_path.as_ref().join("block").join(name), target);
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("file not found: {:?}", path),
        )
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found(path))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        // Find all files, links and directories that are direct children
        let children = self
            .files
            .keys()
            .chain(self.symlinks.keys())
            .chain(self.directories.iter());
        for child in children {
            if child != path && child.parent().is_some_and(|parent| parent == path) {
                entries.insert(child.clone());
            }
        }

        let mut entries: Vec<PathBuf> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }

    fn symlink_target(&self, path: &Path) -> io::Result<Option<PathBuf>> {
        if let Some(target) = self.symlinks.get(path) {
            return Ok(Some(target.clone()));
        }
        if self.files.contains_key(path) || self.directories.contains(path) {
            return Ok(None);
        }
        Err(Self::not_found(path))
    }
}
