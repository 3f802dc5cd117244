//! Filesystem access layer used by the scanner.
//!
//! The scanner only talks to a [`FileSystem`]: list a directory, stat a path,
//! resolve a path. [`OsFileSystem`] is backed by `std::fs`;
//! [`MemoryFileSystem`] is an in-memory tree, handy for reproducing
//! permission failures without touching real permissions.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use compact_str::CompactString;

use dirsight_core::FsError;

/// Kind of a directory entry, without following symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    /// Sockets, devices, fifos.
    Other,
}

/// Metadata the scanner needs about one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub kind: EntryKind,
    /// Apparent size in bytes.
    pub len: u64,
    /// Allocated 512-byte blocks.
    pub blocks: u64,
    pub device: u64,
    pub inode: u64,
    /// Number of hard links.
    pub nlink: u64,
}

/// One entry returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: CompactString,
    pub path: PathBuf,
    /// Metadata of the entry itself (symlinks are not followed).
    pub meta: EntryMeta,
}

/// Read-only access to a directory hierarchy.
pub trait FileSystem: Send + Sync {
    /// List the direct entries of a directory.
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError>;

    /// Stat a path, following symlinks.
    fn metadata(&self, path: &Path) -> Result<EntryMeta, FsError>;

    /// Resolve a path to its canonical absolute form.
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let reader = std::fs::read_dir(path).map_err(|e| FsError::io(path, e))?;
        let mut entries = Vec::new();

        for entry in reader {
            let entry = entry.map_err(|e| FsError::io(path, e))?;
            let entry_path = entry.path();
            let metadata = match entry_path.symlink_metadata() {
                Ok(m) => m,
                // Removed between listing and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(FsError::io(&entry_path, e)),
            };

            entries.push(DirEntry {
                name: CompactString::new(entry.file_name().to_string_lossy()),
                path: entry_path,
                meta: meta_from_std(&metadata),
            });
        }

        Ok(entries)
    }

    fn metadata(&self, path: &Path) -> Result<EntryMeta, FsError> {
        std::fs::metadata(path)
            .map(|m| meta_from_std(&m))
            .map_err(|e| FsError::io(path, e))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        path.canonicalize().map_err(|e| FsError::io(path, e))
    }
}

fn meta_from_std(metadata: &std::fs::Metadata) -> EntryMeta {
    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Dir
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    EntryMeta {
        kind,
        len: metadata.len(),
        blocks: get_blocks(metadata),
        device: get_dev(metadata),
        inode: get_ino(metadata),
        nlink: get_nlink(metadata),
    }
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn get_dev(metadata: &std::fs::Metadata) -> u64 {
    metadata.dev()
}

#[cfg(not(unix))]
fn get_dev(_metadata: &std::fs::Metadata) -> u64 {
    0
}

#[cfg(unix)]
fn get_ino(metadata: &std::fs::Metadata) -> u64 {
    metadata.ino()
}

#[cfg(not(unix))]
fn get_ino(_metadata: &std::fs::Metadata) -> u64 {
    0
}

#[cfg(unix)]
fn get_nlink(metadata: &std::fs::Metadata) -> u64 {
    metadata.nlink()
}

#[cfg(not(unix))]
fn get_nlink(_metadata: &std::fs::Metadata) -> u64 {
    1
}

#[cfg(unix)]
fn get_blocks(metadata: &std::fs::Metadata) -> u64 {
    metadata.blocks()
}

#[cfg(not(unix))]
fn get_blocks(metadata: &std::fs::Metadata) -> u64 {
    metadata.len().div_ceil(512)
}

/// Maximum symlink hops when resolving a path in memory.
const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum MemNode {
    Dir { denied: bool, failure: Option<String> },
    File { size: u64, inode: u64 },
    Symlink { target: PathBuf },
}

/// An in-memory directory hierarchy.
///
/// Paths are absolute. Parents are created on demand, like `mkdir -p`.
/// Entries are listed in path order.
#[derive(Debug, Clone)]
pub struct MemoryFileSystem {
    nodes: BTreeMap<PathBuf, MemNode>,
    next_inode: u64,
    device: u64,
    mounts: BTreeMap<PathBuf, u64>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    /// Create a filesystem containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            PathBuf::from("/"),
            MemNode::Dir {
                denied: false,
                failure: None,
            },
        );
        Self {
            nodes,
            next_inode: 1,
            device: 1,
            mounts: BTreeMap::new(),
        }
    }

    /// Add a directory.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert_dir(path.as_ref(), false, None);
        self
    }

    /// Add a directory that is the root of another device. Everything below
    /// it reports `device`.
    pub fn with_mount(mut self, path: impl AsRef<Path>, device: u64) -> Self {
        let path = path.as_ref();
        self.insert_dir(path, false, None);
        self.mounts.insert(path.to_path_buf(), device);
        self
    }

    /// Add a directory whose listing fails with access denied.
    pub fn with_denied_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert_dir(path.as_ref(), true, None);
        self
    }

    /// Add a directory whose listing fails with a generic I/O error.
    pub fn with_failing_dir(mut self, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        self.insert_dir(path.as_ref(), false, Some(message.into()));
        self
    }

    /// Add a file of the given size.
    pub fn with_file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        let inode = self.allocate_inode();
        self.nodes
            .insert(path.to_path_buf(), MemNode::File { size, inode });
        self
    }

    /// Add a second name for an existing file.
    pub fn with_hardlink(mut self, path: impl AsRef<Path>, existing: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Some(MemNode::File { size, inode }) = self.nodes.get(existing.as_ref()).cloned() {
            self.ensure_parents(path);
            self.nodes
                .insert(path.to_path_buf(), MemNode::File { size, inode });
        }
        self
    }

    /// Add a symbolic link pointing at an absolute target.
    pub fn with_symlink(mut self, path: impl AsRef<Path>, target: impl Into<PathBuf>) -> Self {
        let path = path.as_ref();
        self.ensure_parents(path);
        self.nodes.insert(
            path.to_path_buf(),
            MemNode::Symlink {
                target: target.into(),
            },
        );
        self
    }

    /// Remove a path and everything below it.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.nodes.retain(|p, _| !p.starts_with(path));
    }

    fn insert_dir(&mut self, path: &Path, denied: bool, failure: Option<String>) {
        self.ensure_parents(path);
        self.nodes
            .insert(path.to_path_buf(), MemNode::Dir { denied, failure });
    }

    fn ensure_parents(&mut self, path: &Path) {
        let mut current = PathBuf::new();
        if let Some(parent) = path.parent() {
            for component in parent.components() {
                current.push(component);
                self.nodes.entry(current.clone()).or_insert(MemNode::Dir {
                    denied: false,
                    failure: None,
                });
            }
        }
    }

    fn allocate_inode(&mut self) -> u64 {
        let inode = self.next_inode;
        self.next_inode += 1;
        inode
    }

    fn device_of(&self, path: &Path) -> u64 {
        self.mounts
            .iter()
            .filter(|(mount, _)| path.starts_with(mount))
            .max_by_key(|(mount, _)| mount.components().count())
            .map_or(self.device, |(_, device)| *device)
    }

    fn meta_of(&self, path: &Path, node: &MemNode) -> EntryMeta {
        let (kind, len, inode) = match node {
            MemNode::Dir { .. } => (EntryKind::Dir, 0, 0),
            MemNode::File { size, inode } => (EntryKind::File, *size, *inode),
            MemNode::Symlink { target } => {
                (EntryKind::Symlink, target.as_os_str().len() as u64, 0)
            }
        };
        let nlink = match node {
            MemNode::File { inode, .. } => self
                .nodes
                .values()
                .filter(|n| matches!(n, MemNode::File { inode: i, .. } if i == inode))
                .count() as u64,
            _ => 1,
        };
        EntryMeta {
            kind,
            len,
            blocks: len.div_ceil(512),
            device: self.device_of(path),
            inode,
            nlink,
        }
    }

    /// Resolve every symlink along `path`.
    fn resolve(&self, path: &Path) -> Result<PathBuf, FsError> {
        let mut current = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    current.pop();
                }
                Component::CurDir => {}
                other => current.push(other),
            }

            let mut hops = 0;
            while let Some(MemNode::Symlink { target }) = self.nodes.get(&current) {
                hops += 1;
                if hops > MAX_LINK_HOPS {
                    return Err(FsError::Io {
                        path: path.to_path_buf(),
                        source: std::io::Error::other("too many levels of symbolic links"),
                    });
                }
                current = target.clone();
            }
        }

        if self.nodes.contains_key(&current) {
            Ok(current)
        } else {
            Err(FsError::NotFound {
                path: path.to_path_buf(),
            })
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>, FsError> {
        let resolved = self.resolve(path)?;
        match self.nodes.get(&resolved) {
            None => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
            Some(MemNode::Dir { denied: true, .. }) => Err(FsError::AccessDenied {
                path: path.to_path_buf(),
            }),
            Some(MemNode::Dir {
                failure: Some(message),
                ..
            }) => Err(FsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(message.clone()),
            }),
            // Entries keep the requested path as prefix, even through a link.
            Some(MemNode::Dir { .. }) => Ok(self
                .nodes
                .iter()
                .filter(|(p, _)| p.parent() == Some(resolved.as_path()))
                .map(|(p, node)| {
                    let name = entry_name(p);
                    DirEntry {
                        path: path.join(name.as_str()),
                        name,
                        meta: self.meta_of(p, node),
                    }
                })
                .collect()),
            Some(_) => Err(FsError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other("not a directory"),
            }),
        }
    }

    fn metadata(&self, path: &Path) -> Result<EntryMeta, FsError> {
        let resolved = self.resolve(path)?;
        let node = self.nodes.get(&resolved).ok_or_else(|| FsError::NotFound {
            path: path.to_path_buf(),
        })?;
        Ok(self.meta_of(&resolved, node))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.resolve(path)
    }
}

fn entry_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_default()
}
