//! Directory scanning engine for dirsight.
//!
//! This crate walks a directory subtree and builds a
//! [`DirectoryNode`](dirsight_core::DirectoryNode) tree annotated with sizes
//! and file counts.
//!
//! # Overview
//!
//! - **Depth-first walk**, subdirectories fanned out on rayon
//! - **Partial failures** recorded on the node that failed, never fatal
//! - **Progress callbacks** every N files
//! - **Cooperative cancellation** via `CancellationToken`
//! - **Pluggable filesystem** through the [`FileSystem`] trait
//!
//! # Example
//!
//! ```rust,no_run
//! use dirsight_scan::{ScanConfig, TreeScanner};
//!
//! let scanner = TreeScanner::new();
//! let outcome = scanner.scan(&ScanConfig::new("/path/to/scan")).unwrap();
//!
//! if let Some(tree) = outcome.into_tree() {
//!     println!("Total size: {} bytes", tree.total_size());
//!     println!("Total files: {}", tree.total_files());
//! }
//! ```
//!
//! # Background scans
//!
//! ```rust,no_run
//! use dirsight_scan::{ScanConfig, ScanEvent, ScanSession};
//!
//! # async fn run() {
//! let mut session = ScanSession::new();
//! let mut events = session.start(ScanConfig::new("/path/to/scan"));
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ScanEvent::Progress(p) => println!("Scanned {} files", p.files_scanned),
//!         ScanEvent::Finished(result) => println!("Done: {:?}", result.is_ok()),
//!     }
//! }
//! # }
//! ```

mod fs;
mod inode;
mod progress;
mod scanner;
mod session;

pub use fs::{DirEntry, EntryKind, EntryMeta, FileSystem, MemoryFileSystem, OsFileSystem};
pub use inode::{InodeKey, InodeTracker};
pub use progress::ScanProgress;
pub use scanner::TreeScanner;
pub use session::{SCAN_CHANNEL_SIZE, ScanEvent, ScanSession};

// Re-export core types for convenience
pub use dirsight_core::{
    DirectoryNode, DirectoryTree, FsError, ScanConfig, ScanError, ScanOutcome, TreeStats,
};
