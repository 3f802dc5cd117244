use dirsight_scan::{DirectoryNode, DirectoryTree, ScanConfig, ScanError, TreeScanner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn scan(path: &Path) -> DirectoryTree {
    TreeScanner::new()
        .scan(&ScanConfig::new(path))
        .unwrap()
        .into_tree()
        .expect("scan was cancelled")
}

/// Sum of all file sizes below `path` on disk, skipping symlinks.
fn du(path: &Path) -> u64 {
    let mut total = 0;
    for entry in fs::read_dir(path).unwrap() {
        let entry = entry.unwrap();
        let meta = entry.path().symlink_metadata().unwrap();
        if meta.is_dir() {
            total += du(&entry.path());
        } else if meta.is_file() {
            total += meta.len();
        }
    }
    total
}

fn assert_aggregates(node: &DirectoryNode) {
    if node.is_errored() {
        assert_eq!(node.size, 0);
        assert_eq!(node.file_count, 0);
        assert!(node.children.is_empty());
        return;
    }
    let child_size: u64 = node.children.iter().map(|c| c.size).sum();
    assert!(node.size >= child_size, "{} smaller than its children", node.path.display());
    for child in &node.children {
        assert!(child.path.starts_with(&node.path));
        assert_aggregates(child);
    }
}

fn build_tree(root: &Path) {
    for (dir, files) in [
        ("a", 3usize),
        ("a/b", 2),
        ("a/b/c", 4),
        ("d", 1),
        ("e", 0),
    ] {
        fs::create_dir_all(root.join(dir)).unwrap();
        for i in 0..files {
            let body = "x".repeat((i + 1) * 37);
            fs::write(root.join(dir).join(format!("f{i}.bin")), body).unwrap();
        }
    }
    fs::write(root.join("top.txt"), "top level").unwrap();
}

#[test]
fn test_size_matches_disk() {
    let temp = TempDir::new().unwrap();
    build_tree(temp.path());

    let tree = scan(temp.path());
    assert_eq!(tree.total_size(), du(temp.path()));
    assert_eq!(tree.total_files(), 3 + 2 + 4 + 1 + 1);
    assert_aggregates(&tree.root);
}

#[test]
fn test_rescan_is_idempotent() {
    let temp = TempDir::new().unwrap();
    build_tree(temp.path());

    let first = scan(temp.path());
    let second = scan(temp.path());
    assert!(first.root.same_structure(&second.root));
}

#[test]
fn test_paths_are_unique() {
    let temp = TempDir::new().unwrap();
    build_tree(temp.path());
    let tree = scan(temp.path());

    fn collect<'a>(node: &'a DirectoryNode, out: &mut Vec<&'a Path>) {
        out.push(&node.path);
        for child in &node.children {
            collect(child, out);
        }
    }
    let mut paths = Vec::new();
    collect(&tree.root, &mut paths);
    let total = paths.len();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), total);
    assert_eq!(total as u64, tree.stats.total_dirs);
}

#[test]
fn test_missing_root() {
    let temp = TempDir::new().unwrap();
    let result = TreeScanner::new().scan(&ScanConfig::new(temp.path().join("gone")));
    assert!(matches!(result, Err(ScanError::RootUnreachable { .. })));
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("f1"), vec![0u8; 100]).unwrap();
    fs::create_dir_all(temp.path().join("sub/locked")).unwrap();
    fs::write(temp.path().join("sub/f2"), vec![0u8; 924]).unwrap();
    fs::write(temp.path().join("sub/locked/hidden"), vec![0u8; 50]).unwrap();

    let locked = temp.path().join("sub/locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not apply to root.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let tree = scan(temp.path());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(tree.total_size(), 1024);
    assert_eq!(tree.total_files(), 2);
    let node = tree
        .root
        .find(&tree.root.path.join("sub/locked"))
        .unwrap();
    assert_eq!(node.scan_error.as_deref(), Some("Access denied"));
}

#[cfg(unix)]
#[test]
fn test_symlink_loop_on_disk() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("a")).unwrap();
    fs::write(temp.path().join("a/f"), "12345").unwrap();
    std::os::unix::fs::symlink(temp.path(), temp.path().join("a/back")).unwrap();

    let default = scan(temp.path());
    assert_eq!(default.total_size(), 5);
    assert_eq!(default.total_files(), 2);

    let config = ScanConfig::builder()
        .root(temp.path())
        .follow_symlinks(true)
        .build()
        .unwrap();
    let followed = TreeScanner::new()
        .scan(&config)
        .unwrap()
        .into_tree()
        .unwrap();
    let back = followed
        .root
        .find(&followed.root.path.join("a/back"))
        .unwrap();
    assert!(back.is_errored());
    assert_eq!(followed.total_size(), 5);
}
