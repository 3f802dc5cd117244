//! Recursive directory scanner.

use std::path::{Path, PathBuf};
use std::time::Instant;

use compact_str::CompactString;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use dirsight_core::{DirectoryNode, DirectoryTree, FsError, ScanConfig, ScanError, ScanOutcome};

use crate::fs::{DirEntry, EntryKind, EntryMeta, FileSystem, OsFileSystem};
use crate::inode::{InodeKey, InodeTracker};
use crate::progress::{ProgressTracker, ScanProgress};

/// Depth-first scanner producing a [`DirectoryNode`] tree.
///
/// Each directory is listed once. Files are folded into the totals of the
/// directory that holds them; subdirectories are walked in parallel on the
/// rayon pool and their totals added once they return.
#[derive(Debug, Default)]
pub struct TreeScanner<F = OsFileSystem> {
    fs: F,
}

impl TreeScanner {
    /// Create a scanner over the real filesystem.
    pub fn new() -> Self {
        Self { fs: OsFileSystem }
    }
}

impl<F: FileSystem> TreeScanner<F> {
    /// Create a scanner over any filesystem implementation.
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    /// Get the underlying filesystem.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Scan without progress reporting or cancellation.
    pub fn scan(&self, config: &ScanConfig) -> Result<ScanOutcome, ScanError> {
        self.scan_with(config, |_| {}, &CancellationToken::new())
    }

    /// Scan `config.root`.
    ///
    /// `on_progress` is called every `config.progress_interval` files, from
    /// whichever thread counted the file. `cancel` is checked before each
    /// directory is listed; once set the scan returns
    /// [`ScanOutcome::Cancelled`].
    ///
    /// Only a root that cannot be opened fails the scan. Any directory below
    /// it that cannot be listed is kept in the tree with `scan_error` set.
    pub fn scan_with<P>(
        &self,
        config: &ScanConfig,
        on_progress: P,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError>
    where
        P: Fn(ScanProgress) + Sync,
    {
        let start = Instant::now();
        let unreachable = |source: FsError| ScanError::RootUnreachable {
            path: config.root.clone(),
            source,
        };

        let root_path = self.fs.canonicalize(&config.root).map_err(unreachable)?;
        let root_meta = self.fs.metadata(&root_path).map_err(unreachable)?;
        if root_meta.kind != EntryKind::Dir {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let walk = Walk {
            fs: &self.fs,
            config,
            ignore: build_ignore_set(&config.ignore_patterns)?,
            root_device: root_meta.device,
            tracker: ProgressTracker::new(config.progress_interval),
            inodes: InodeTracker::new(),
            on_progress: &on_progress,
            cancel,
        };

        let entries = self.fs.read_dir(&root_path).map_err(unreachable)?;
        let lineage = Lineage {
            real: root_path.clone(),
            parent: None,
        };
        let name = CompactString::new(root_path.to_string_lossy());

        let root = match config.threads {
            0 => walk.build_node(&root_path, name, entries, &lineage),
            n => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| ScanError::InvalidConfig {
                        message: e.to_string(),
                    })?;
                pool.install(|| walk.build_node(&root_path, name, entries, &lineage))
            }
        };

        if cancel.is_cancelled() {
            info!(root = %root_path.display(), "scan cancelled");
            return Ok(ScanOutcome::Cancelled);
        }

        let tree = DirectoryTree::new(root, start.elapsed());
        info!(
            root = %root_path.display(),
            files = tree.total_files(),
            bytes = tree.total_size(),
            errored_dirs = tree.stats.errored_dirs,
            elapsed_ms = tree.scan_duration.as_millis() as u64,
            "scan complete"
        );
        Ok(ScanOutcome::Complete(tree))
    }
}

/// Compile ignore patterns, matched against entry names.
fn build_ignore_set(patterns: &[String]) -> Result<Option<GlobSet>, ScanError> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ScanError::InvalidConfig {
            message: format!("bad ignore pattern {pattern:?}: {e}"),
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map(Some)
        .map_err(|e| ScanError::InvalidConfig {
            message: e.to_string(),
        })
}

/// Real locations of the directories above the one being walked, used to
/// refuse symlinks that lead back into an ancestor.
struct Lineage<'a> {
    real: PathBuf,
    parent: Option<&'a Lineage<'a>>,
}

impl Lineage<'_> {
    fn contains(&self, path: &Path) -> bool {
        let mut current = Some(self);
        while let Some(link) = current {
            if link.real == path {
                return true;
            }
            current = link.parent;
        }
        false
    }
}

/// Error recorded on a directory that lives on another device.
const OTHER_FILESYSTEM: &str = "Other filesystem";

/// A subdirectory waiting to be walked.
struct Subdir {
    name: CompactString,
    path: PathBuf,
    via_link: bool,
    other_device: bool,
}

/// Checked running totals for one directory.
#[derive(Default)]
struct Totals {
    bytes: u64,
    files: u64,
}

impl Totals {
    /// Add to the totals. Returns `false` on overflow.
    fn add(&mut self, bytes: u64, files: u64) -> bool {
        match (self.bytes.checked_add(bytes), self.files.checked_add(files)) {
            (Some(b), Some(f)) => {
                self.bytes = b;
                self.files = f;
                true
            }
            _ => false,
        }
    }
}

/// State shared by every directory of one scan run.
struct Walk<'a, F, P> {
    fs: &'a F,
    config: &'a ScanConfig,
    ignore: Option<GlobSet>,
    root_device: u64,
    tracker: ProgressTracker,
    inodes: InodeTracker,
    on_progress: &'a P,
    cancel: &'a CancellationToken,
}

impl<F, P> Walk<'_, F, P>
where
    F: FileSystem,
    P: Fn(ScanProgress) + Sync,
{
    fn walk_dir(&self, path: &Path, name: CompactString, lineage: &Lineage<'_>) -> DirectoryNode {
        // The result is thrown away by the caller once cancelled.
        if self.cancel.is_cancelled() {
            return DirectoryNode::new(name, path);
        }

        match self.fs.read_dir(path) {
            Ok(entries) => self.build_node(path, name, entries, lineage),
            Err(err) => self.failed(path, name, &err),
        }
    }

    fn build_node(
        &self,
        path: &Path,
        name: CompactString,
        entries: Vec<DirEntry>,
        lineage: &Lineage<'_>,
    ) -> DirectoryNode {
        self.tracker.record_dir();

        let mut node = DirectoryNode::new(name, path);
        let mut totals = Totals::default();
        let mut subdirs = Vec::new();

        for entry in entries {
            if self.skipped(&entry.name) {
                continue;
            }

            let file_bytes = match entry.meta.kind {
                EntryKind::File => Some(self.file_size(&entry.meta)),
                EntryKind::Dir => {
                    subdirs.push(Subdir {
                        other_device: self.crosses_device(&entry.meta),
                        name: entry.name,
                        path: entry.path,
                        via_link: false,
                    });
                    None
                }
                EntryKind::Symlink => match self.follow(&entry.path) {
                    Some(target) if target.kind == EntryKind::Dir => {
                        subdirs.push(Subdir {
                            other_device: self.crosses_device(&target),
                            name: entry.name,
                            path: entry.path,
                            via_link: true,
                        });
                        None
                    }
                    Some(target) if target.kind == EntryKind::File => {
                        Some(self.file_size(&target))
                    }
                    // Unfollowed or dangling links count as empty files.
                    _ => Some(0),
                },
                EntryKind::Other => None,
            };

            if let Some(bytes) = file_bytes {
                if !totals.add(bytes, 1) {
                    return self.overflowed(node);
                }
                if let Some(count) = self.tracker.record_file(bytes) {
                    self.tracker.report(count, path, self.on_progress);
                }
            }
        }

        let children: Vec<DirectoryNode> = subdirs
            .into_par_iter()
            .map(|subdir| self.walk_subdir(subdir, lineage))
            .collect();

        for child in &children {
            if !child.is_errored() && !totals.add(child.size, child.file_count) {
                return self.overflowed(node);
            }
        }

        node.size = totals.bytes;
        node.file_count = totals.files;
        node.children = children;
        node
    }

    fn walk_subdir(&self, subdir: Subdir, lineage: &Lineage<'_>) -> DirectoryNode {
        // Kept visible, but never descended into.
        if subdir.other_device {
            self.tracker.record_error();
            debug!(path = %subdir.path.display(), "skipping other filesystem");
            return DirectoryNode::errored(subdir.name, &subdir.path, OTHER_FILESYSTEM);
        }

        let real = if subdir.via_link {
            match self.fs.canonicalize(&subdir.path) {
                Ok(real) => real,
                Err(err) => return self.failed(&subdir.path, subdir.name, &err),
            }
        } else {
            lineage.real.join(subdir.name.as_str())
        };

        if subdir.via_link && lineage.contains(&real) {
            self.tracker.record_error();
            debug!(path = %subdir.path.display(), target = %real.display(), "symlink cycle");
            return DirectoryNode::errored(
                subdir.name,
                &subdir.path,
                format!("Symlink cycle: points to {}", real.display()),
            );
        }

        let child = Lineage {
            real,
            parent: Some(lineage),
        };
        self.walk_dir(&subdir.path, subdir.name, &child)
    }

    fn failed(&self, path: &Path, name: CompactString, err: &FsError) -> DirectoryNode {
        self.tracker.record_error();
        debug!(path = %path.display(), error = %err, "directory not scanned");
        DirectoryNode::errored(name, path, err.node_message())
    }

    fn overflowed(&self, mut node: DirectoryNode) -> DirectoryNode {
        self.tracker.record_error();
        debug!(path = %node.path.display(), "size overflow");
        node.mark_errored("Size overflow");
        node
    }

    fn skipped(&self, name: &str) -> bool {
        self.config.should_skip_hidden(name)
            || self.ignore.as_ref().is_some_and(|set| set.is_match(name))
    }

    fn crosses_device(&self, meta: &EntryMeta) -> bool {
        !self.config.cross_filesystems && meta.device != self.root_device
    }

    fn follow(&self, path: &Path) -> Option<EntryMeta> {
        if !self.config.follow_symlinks {
            return None;
        }
        self.fs.metadata(path).ok()
    }

    fn file_size(&self, meta: &EntryMeta) -> u64 {
        if self.config.dedupe_hardlinks
            && meta.nlink > 1
            && !self.inodes.track(InodeKey::new(meta.device, meta.inode))
        {
            return 0;
        }

        if self.config.apparent_size {
            meta.len
        } else {
            meta.blocks.saturating_mul(512)
        }
    }
}
