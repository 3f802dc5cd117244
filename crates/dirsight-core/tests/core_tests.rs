use dirsight_core::{
    DirectoryNode, DirectoryTree, ScanConfig, ScanOutcome, TreeStats, format_size, parse_size,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `/data` with `f1` (100 B), `sub/f2` (924 B) and an unreadable `sub/locked`.
fn data_tree() -> DirectoryNode {
    let mut root = DirectoryNode::new("/data", "/data");
    let mut sub = DirectoryNode::new("sub", "/data/sub");
    sub.children.push(DirectoryNode::errored(
        "locked",
        "/data/sub/locked",
        "Access denied",
    ));
    sub.size = 924;
    sub.file_count = 1;
    root.size = 100 + sub.size;
    root.file_count = 1 + sub.file_count;
    root.children.push(sub);
    root
}

fn check_sums(node: &DirectoryNode) {
    if node.is_errored() {
        assert_eq!(node.size, 0);
        assert_eq!(node.file_count, 0);
        assert!(node.children.is_empty());
        return;
    }
    let child_size: u64 = node.children.iter().map(|c| c.size).sum();
    let child_files: u64 = node.children.iter().map(|c| c.file_count).sum();
    assert!(node.size >= child_size);
    assert!(node.file_count >= child_files);
    for child in &node.children {
        check_sums(child);
    }
}

#[test]
fn test_data_scenario_shape() {
    let root = data_tree();
    check_sums(&root);

    assert_eq!(root.size, 1024);
    assert_eq!(root.file_count, 2);
    assert_eq!(root.find(Path::new("/data/sub")).unwrap().size, 924);
    assert!(root
        .find(Path::new("/data/sub/locked"))
        .unwrap()
        .scan_error
        .is_some());
    assert_eq!(format_size(root.size), "1.0 KB");
}

#[test]
fn test_tree_wrapper_stats() {
    let tree = DirectoryTree::new(data_tree(), Duration::from_millis(5));

    assert_eq!(tree.root_path(), Path::new("/data"));
    assert_eq!(tree.total_size(), 1024);
    assert_eq!(tree.total_files(), 2);
    assert!(tree.has_errors());
    assert_eq!(
        tree.stats,
        TreeStats {
            total_size: 1024,
            total_files: 2,
            total_dirs: 3,
            errored_dirs: 1,
            max_depth: 2,
        }
    );
}

#[test]
fn test_cancelled_outcome_has_no_tree() {
    let outcome = ScanOutcome::Cancelled;
    assert!(outcome.is_cancelled());
    assert!(outcome.into_tree().is_none());
}

#[test]
fn test_node_json_round_trip_skips_empty_error() {
    let root = data_tree();
    let json = serde_json::to_string(&root).unwrap();

    // Only the locked directory carries an error field.
    assert_eq!(json.matches("scan_error").count(), 1);

    let back: DirectoryNode = serde_json::from_str(&json).unwrap();
    assert_eq!(back, root);
}

#[test]
fn test_config_round_trip() {
    let config = ScanConfig::builder()
        .root("/srv")
        .ignore_patterns(vec!["*.log".to_string()])
        .dedupe_hardlinks(true)
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let back: ScanConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.root, PathBuf::from("/srv"));
    assert_eq!(back.ignore_patterns, vec!["*.log".to_string()]);
    assert!(back.dedupe_hardlinks);
}

#[test]
fn test_format_then_parse() {
    assert_eq!(parse_size(&format_size(1536)).unwrap(), 1536);
    assert_eq!(parse_size(&format_size(1024)).unwrap(), 1024);
}
