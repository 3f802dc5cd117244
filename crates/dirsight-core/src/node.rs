//! Directory node type.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One directory as seen by a single scan.
///
/// Files are not represented as nodes; they are folded into `size` and
/// `file_count`. A node with `scan_error` set always has zero totals and no
/// children, so it never contributes to its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Leaf component of the path, or the full path for the scan root.
    pub name: CompactString,

    /// Canonical absolute path. Unique within one scan.
    pub path: PathBuf,

    /// Total bytes of all files below this directory.
    pub size: u64,

    /// Total number of files below this directory.
    pub file_count: u64,

    /// Subdirectories in enumeration order.
    pub children: Vec<DirectoryNode>,

    /// Why this directory could not be scanned, if it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

impl DirectoryNode {
    /// Create an empty directory node.
    pub fn new(name: impl Into<CompactString>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size: 0,
            file_count: 0,
            children: Vec::new(),
            scan_error: None,
        }
    }

    /// Create a node for a directory that failed to scan.
    pub fn errored(
        name: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            scan_error: Some(message.into()),
            ..Self::new(name, path)
        }
    }

    /// Display name for a path: its last component, or the whole path when
    /// there is none (e.g. `/`).
    pub fn display_name(path: &Path) -> CompactString {
        path.file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
    }

    /// Turn this node into an errored one, dropping everything gathered so far.
    pub fn mark_errored(&mut self, message: impl Into<String>) {
        self.size = 0;
        self.file_count = 0;
        self.children.clear();
        self.scan_error = Some(message.into());
    }

    /// Check if this directory failed to scan.
    pub fn is_errored(&self) -> bool {
        self.scan_error.is_some()
    }

    /// Get the number of direct subdirectories.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Count all directories below this one (not including itself).
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Find the node with the given path in this subtree.
    pub fn find(&self, path: &Path) -> Option<&DirectoryNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|c| c.find(path))
    }

    /// Collect every errored node in this subtree, in depth-first order.
    pub fn errored_nodes(&self) -> Vec<&DirectoryNode> {
        let mut out = Vec::new();
        self.collect_errored(&mut out);
        out
    }

    fn collect_errored<'a>(&'a self, out: &mut Vec<&'a DirectoryNode>) {
        if self.is_errored() {
            out.push(self);
        }
        for child in &self.children {
            child.collect_errored(out);
        }
    }

    /// Structural equality that ignores the order of children.
    ///
    /// Two scans of an unchanged directory may enumerate entries in a
    /// different order; this is the equality they are expected to satisfy.
    pub fn same_structure(&self, other: &DirectoryNode) -> bool {
        if self.name != other.name
            || self.path != other.path
            || self.size != other.size
            || self.file_count != other.file_count
            || self.scan_error != other.scan_error
            || self.children.len() != other.children.len()
        {
            return false;
        }

        self.children.iter().all(|child| {
            other
                .children
                .iter()
                .find(|o| o.path == child.path)
                .is_some_and(|o| child.same_structure(o))
        })
    }
}
