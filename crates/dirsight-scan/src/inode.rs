//! Inode tracking for hardlink deduplication.

use dashmap::DashSet;

/// Identity of a file on disk, shared by all of its hard links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InodeKey {
    pub device: u64,
    pub inode: u64,
}

impl InodeKey {
    /// Create a new inode key.
    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }
}

/// Tracks seen inodes so a multiply-linked file is counted once per scan.
///
/// Subdirectories are walked in parallel, so the set is concurrent.
#[derive(Debug, Default)]
pub struct InodeTracker {
    seen: DashSet<InodeKey>,
}

impl InodeTracker {
    /// Create a new inode tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Track an inode. Returns `true` the first time it is seen.
    pub fn track(&self, key: InodeKey) -> bool {
        self.seen.insert(key)
    }

    /// Get the number of unique inodes tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no inodes have been tracked.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
