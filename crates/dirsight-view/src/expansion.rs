//! Which directories are expanded, tracked by path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dirsight_core::DirectoryNode;

/// Set of expanded directory paths.
///
/// Lives independently of any tree snapshot. A rescan replaces the whole
/// tree, and a node is shown expanded in the new one exactly when its path
/// is in this set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    expanded: HashSet<PathBuf>,
}

impl ExpansionState {
    /// Create an empty expansion state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state with only `root` expanded.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let mut state = Self::new();
        state.expanded.insert(root.into());
        state
    }

    /// Expand a path.
    pub fn expand(&mut self, path: impl Into<PathBuf>) {
        self.expanded.insert(path.into());
    }

    /// Collapse a path. Its descendants keep their own state.
    pub fn collapse(&mut self, path: &Path) {
        self.expanded.remove(path);
    }

    /// Toggle a path. Returns the new state.
    pub fn toggle(&mut self, path: &Path) -> bool {
        if self.expanded.remove(path) {
            false
        } else {
            self.expanded.insert(path.to_path_buf());
            true
        }
    }

    /// Collapse a path and everything below it.
    pub fn collapse_subtree(&mut self, path: &Path) {
        self.expanded.retain(|p| !p.starts_with(path));
    }

    /// Expand every directory of `tree` that has children.
    pub fn expand_all(&mut self, tree: &DirectoryNode) {
        if tree.children.is_empty() {
            return;
        }
        self.expanded.insert(tree.path.clone());
        for child in &tree.children {
            self.expand_all(child);
        }
    }

    /// Collapse everything.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Forget paths that do not exist in `tree`.
    ///
    /// Never done implicitly: a directory that briefly disappears between two
    /// scans keeps its state unless the caller prunes.
    pub fn prune(&mut self, tree: &DirectoryNode) {
        self.expanded.retain(|p| tree.find(p).is_some());
    }

    /// Check if a path is expanded.
    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(path)
    }

    /// Number of expanded paths.
    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    /// Check if nothing is expanded.
    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Iterate over expanded paths, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.expanded.iter().map(PathBuf::as_path)
    }
}
