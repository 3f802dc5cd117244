//! Completed scan results.

use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::node::DirectoryNode;

/// Summary statistics for a scanned tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Total size in bytes.
    pub total_size: u64,
    /// Total number of files.
    pub total_files: u64,
    /// Total number of directories, including the root.
    pub total_dirs: u64,
    /// Directories that could not be scanned.
    pub errored_dirs: u64,
    /// Maximum depth reached below the root.
    pub max_depth: u32,
}

impl TreeStats {
    /// Compute statistics from a finished tree.
    pub fn from_root(root: &DirectoryNode) -> Self {
        let mut stats = Self {
            total_size: root.size,
            total_files: root.file_count,
            ..Self::default()
        };
        stats.visit(root, 0);
        stats
    }

    fn visit(&mut self, node: &DirectoryNode, depth: u32) {
        self.total_dirs += 1;
        self.max_depth = self.max_depth.max(depth);
        if node.is_errored() {
            self.errored_dirs += 1;
        }
        for child in &node.children {
            self.visit(child, depth + 1);
        }
    }
}

/// Complete scanned directory tree with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryTree {
    /// Root node of the tree.
    pub root: DirectoryNode,

    /// When this scan finished.
    pub scanned_at: SystemTime,

    /// Duration of the scan.
    pub scan_duration: Duration,

    /// Summary statistics.
    pub stats: TreeStats,
}

impl DirectoryTree {
    /// Wrap a finished root node.
    pub fn new(root: DirectoryNode, scan_duration: Duration) -> Self {
        let stats = TreeStats::from_root(&root);
        Self {
            root,
            scanned_at: SystemTime::now(),
            scan_duration,
            stats,
        }
    }

    /// Root path that was scanned.
    pub fn root_path(&self) -> &Path {
        &self.root.path
    }

    /// Get the total size of the tree.
    pub fn total_size(&self) -> u64 {
        self.root.size
    }

    /// Get the total number of files.
    pub fn total_files(&self) -> u64 {
        self.root.file_count
    }

    /// Check if any directory failed to scan.
    pub fn has_errors(&self) -> bool {
        self.stats.errored_dirs > 0
    }
}

/// How a scan ended, when it did not fail outright.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The walk finished.
    Complete(DirectoryTree),
    /// The walk was cancelled. No partial tree is kept.
    Cancelled,
}

impl ScanOutcome {
    /// Check if the scan was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get the finished tree, if any.
    pub fn into_tree(self) -> Option<DirectoryTree> {
        match self {
            Self::Complete(tree) => Some(tree),
            Self::Cancelled => None,
        }
    }
}
