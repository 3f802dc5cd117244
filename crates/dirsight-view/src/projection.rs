//! Sorted, percentage-annotated projection of a scanned tree.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use itertools::Itertools;

use dirsight_core::{DirectoryNode, format_size};

use crate::expansion::ExpansionState;
use crate::sort::SortSpec;

/// A node of the projection handed to a renderer.
///
/// Rebuilt from scratch on every refresh, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub name: CompactString,
    pub path: PathBuf,
    pub size: u64,
    pub file_count: u64,
    pub scan_error: Option<String>,
    /// Size as a percentage of the parent's size. `None` at the root and
    /// when the parent is empty.
    pub percent_of_parent: Option<f64>,
    pub expanded: bool,
    /// Subdirectories in display order.
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    /// Check if this directory failed to scan.
    pub fn is_errored(&self) -> bool {
        self.scan_error.is_some()
    }

    /// Human readable size.
    pub fn display_size(&self) -> String {
        format_size(self.size)
    }

    /// Find a node by path.
    pub fn find(&self, path: &Path) -> Option<&ViewNode> {
        if self.path == path {
            return Some(self);
        }
        if !path.starts_with(&self.path) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(path))
    }

    /// Flatten into display rows: this node, then the rows of each child
    /// when expanded.
    pub fn visible_rows(&self) -> Vec<VisibleRow<'_>> {
        let mut rows = Vec::new();
        self.push_rows(0, &mut rows);
        rows
    }

    fn push_rows<'a>(&'a self, depth: usize, rows: &mut Vec<VisibleRow<'a>>) {
        rows.push(VisibleRow { node: self, depth });
        if self.expanded {
            for child in &self.children {
                child.push_rows(depth + 1, rows);
            }
        }
    }
}

/// One line of a flattened projection.
#[derive(Debug, Clone, Copy)]
pub struct VisibleRow<'a> {
    pub node: &'a ViewNode,
    /// Distance from the projection root.
    pub depth: usize,
}

impl VisibleRow<'_> {
    /// Check if the row can be expanded or collapsed.
    pub fn has_children(&self) -> bool {
        !self.node.children.is_empty()
    }
}

/// Project `tree` for display.
///
/// Siblings are ordered by `sort` at every level, percentages are computed
/// against the parent's size, and each node's `expanded` flag comes from
/// `expansion`. The tree itself is not modified.
pub fn project(tree: &DirectoryNode, sort: SortSpec, expansion: &ExpansionState) -> ViewNode {
    project_node(tree, None, sort, expansion)
}

fn project_node(
    node: &DirectoryNode,
    parent_size: Option<u64>,
    sort: SortSpec,
    expansion: &ExpansionState,
) -> ViewNode {
    let mut children = node
        .children
        .iter()
        .map(|child| project_node(child, Some(node.size), sort, expansion))
        .collect_vec();
    sort.apply(&mut children);

    ViewNode {
        name: node.name.clone(),
        path: node.path.clone(),
        size: node.size,
        file_count: node.file_count,
        scan_error: node.scan_error.clone(),
        percent_of_parent: percent(node.size, parent_size),
        expanded: expansion.is_expanded(&node.path),
        children,
    }
}

fn percent(size: u64, parent_size: Option<u64>) -> Option<f64> {
    match parent_size {
        Some(total) if total > 0 => Some(size as f64 / total as f64 * 100.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortColumn;

    fn sized(name: &str, path: &str, size: u64, files: u64) -> DirectoryNode {
        let mut node = DirectoryNode::new(name, path);
        node.size = size;
        node.file_count = files;
        node
    }

    fn data_tree() -> DirectoryNode {
        let mut root = sized("/data", "/data", 1024, 2);
        root.children.push(sized("sub", "/data/sub", 924, 1));
        root.children
            .push(DirectoryNode::errored("locked", "/data/locked", "Access denied"));
        root
    }

    #[test]
    fn test_percentages() {
        let view = project(&data_tree(), SortSpec::default(), &ExpansionState::new());

        assert_eq!(view.percent_of_parent, None);
        let sub = view.find(Path::new("/data/sub")).unwrap();
        let expected = 924.0 / 1024.0 * 100.0;
        assert!((sub.percent_of_parent.unwrap() - expected).abs() < 1e-9);

        let locked = view.find(Path::new("/data/locked")).unwrap();
        assert!(locked.is_errored());
        assert_eq!(locked.percent_of_parent, Some(0.0));
    }

    #[test]
    fn test_empty_parent_has_no_percent() {
        let mut root = DirectoryNode::new("/e", "/e");
        root.children.push(DirectoryNode::new("x", "/e/x"));

        let view = project(&root, SortSpec::default(), &ExpansionState::new());
        assert_eq!(view.children[0].percent_of_parent, None);
    }

    #[test]
    fn test_sorted_at_every_level() {
        let mut root = sized("/r", "/r", 60, 0);
        let mut a = sized("a", "/r/a", 10, 0);
        a.children.push(sized("x", "/r/a/x", 1, 0));
        a.children.push(sized("y", "/r/a/y", 9, 0));
        root.children.push(a);
        root.children.push(sized("b", "/r/b", 50, 0));

        let view = project(&root, SortSpec::descending(SortColumn::Size), &ExpansionState::new());
        assert_eq!(view.children[0].name, "b");
        assert_eq!(view.children[1].children[0].name, "y");

        // The source tree keeps scan order.
        assert_eq!(root.children[0].name, "a");
    }

    #[test]
    fn test_visible_rows_follow_expansion() {
        let tree = data_tree();
        let mut expansion = ExpansionState::new();

        let view = project(&tree, SortSpec::default(), &expansion);
        assert_eq!(view.visible_rows().len(), 1);

        expansion.expand("/data");
        let view = project(&tree, SortSpec::default(), &expansion);
        let rows = view.visible_rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].depth, 0);
        assert!(rows[0].has_children());
        assert_eq!(rows[1].node.name, "sub");
        assert_eq!(rows[1].depth, 1);
        assert_eq!(rows[1].node.display_size(), "924.0 B");
    }
}
