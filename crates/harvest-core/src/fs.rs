//! Filesystem access abstraction used by the scan worker.
//!
//! The worker never touches `std::fs` directly; it goes through a
//! [`FileSystem`] so that tests and embedders can substitute an in-memory
//! tree for the real disk.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Classification of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file (or a symlink resolving to one).
    File,
    /// Directory.
    Directory,
    /// Anything the scanner does not publish or descend into.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// A single entry returned by [`FileSystem::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name exactly as stored, used to build the published path.
    pub file_name: OsString,
    /// Lossy UTF-8 form of `file_name`, used for matching and display.
    pub name: CompactString,
    /// Entry classification.
    pub kind: EntryKind,
}

impl DirEntry {
    /// Create a new entry.
    pub fn new(file_name: impl Into<OsString>, kind: EntryKind) -> Self {
        let file_name = file_name.into();
        let name = CompactString::from(&*file_name.to_string_lossy());
        Self {
            file_name,
            name,
            kind,
        }
    }
}

/// Read-only view of a filesystem.
pub trait FileSystem: Send + Sync + 'static {
    /// List the entries of a directory.
    ///
    /// The outer error means the directory itself could not be read. An
    /// inner error marks a single entry that could not be read; its
    /// siblings are still listed.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<io::Result<DirEntry>>>;

    /// Check whether a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check whether a path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Resolve the kind of `dir/name`.
    fn kind_of(&self, dir: &Path, name: &str) -> EntryKind {
        let path = dir.join(name);
        if self.is_dir(&path) {
            EntryKind::Directory
        } else if self.exists(&path) {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// The real filesystem, backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem {
    follow_symlinks: bool,
}

impl OsFileSystem {
    /// Create a filesystem view that does not descend through symlinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow symlinked directories while listing.
    ///
    /// Cycles are not detected; only enable this for trees known to be acyclic.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    fn classify(&self, entry: &std::fs::DirEntry) -> io::Result<EntryKind> {
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            return Ok(EntryKind::Directory);
        }
        if file_type.is_file() {
            return Ok(EntryKind::File);
        }
        if file_type.is_symlink() {
            // Broken links resolve to nothing.
            let Ok(target) = std::fs::metadata(entry.path()) else {
                return Ok(EntryKind::Other);
            };
            return Ok(if target.is_file() {
                EntryKind::File
            } else if target.is_dir() && self.follow_symlinks {
                EntryKind::Directory
            } else {
                EntryKind::Other
            });
        }
        Ok(EntryKind::Other)
    }
}

impl FileSystem for OsFileSystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<io::Result<DirEntry>>> {
        let entries = std::fs::read_dir(dir)?
            .map(|entry| -> io::Result<DirEntry> {
                let entry = entry?;
                let kind = self.classify(&entry).map_err(|err| {
                    io::Error::new(
                        err.kind(),
                        format!("{}: {err}", entry.file_name().to_string_lossy()),
                    )
                })?;
                Ok(DirEntry::new(entry.file_name(), kind))
            })
            .collect();
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryNode {
    File,
    Directory,
}

/// An in-memory directory tree.
///
/// Parents are created implicitly. Directories can be marked unreadable to
/// simulate permission failures, single entries can be made to fail inside
/// an otherwise readable listing, and a per-listing latency can be added to
/// slow the worker down.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, MemoryNode>,
    denied: BTreeSet<PathBuf>,
    broken: BTreeSet<PathBuf>,
    latency: Option<Duration>,
}

impl MemoryFileSystem {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory (and its ancestors).
    pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(MemoryNode::Directory);
        }
        self
    }

    /// Add a file (and its parent directories).
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.nodes.insert(path.to_path_buf(), MemoryNode::File);
        self
    }

    /// Make listing `path` fail with `PermissionDenied`.
    pub fn deny(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.denied.insert(path.as_ref().to_path_buf());
        self
    }

    /// Make the entry at `path` fail when its parent is listed.
    pub fn break_entry(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.broken.insert(path.as_ref().to_path_buf());
        self
    }

    /// Sleep for `latency` on every listing.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<io::Result<DirEntry>>> {
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        if self.denied.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is not readable", dir.display()),
            ));
        }
        match self.nodes.get(dir) {
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} does not exist", dir.display()),
                ));
            }
            Some(MemoryNode::File) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("{} is a file", dir.display()),
                ));
            }
            Some(MemoryNode::Directory) => {}
        }

        // Descendants of `dir` sort directly after it.
        let entries = self
            .nodes
            .range::<Path, _>((Bound::Excluded(dir), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(dir))
            .filter(|(path, _)| path.parent() == Some(dir))
            .filter_map(|(path, node)| {
                let name = path.file_name()?;
                if self.broken.contains(path) {
                    return Some(Err(io::Error::other(format!(
                        "{} could not be read",
                        path.display()
                    ))));
                }
                let kind = match node {
                    MemoryNode::File => EntryKind::File,
                    MemoryNode::Directory => EntryKind::Directory,
                };
                Some(Ok(DirEntry::new(name, kind)))
            })
            .collect();
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.nodes.get(path) == Some(&MemoryNode::Directory)
    }
}
