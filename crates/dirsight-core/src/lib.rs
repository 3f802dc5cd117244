//! Core types for dirsight.
//!
//! This crate provides the data structures shared by the scanner, the change
//! monitor and the view layer: directory nodes, scan results, configuration,
//! error types and byte size formatting.

mod config;
mod error;
mod node;
mod size;
mod tree;

pub use config::{DEFAULT_PROGRESS_INTERVAL, ScanConfig, ScanConfigBuilder};
pub use error::{FsError, ScanError};
pub use node::DirectoryNode;
pub use size::{SizeParseError, format_size, parse_size};
pub use tree::{DirectoryTree, ScanOutcome, TreeStats};
