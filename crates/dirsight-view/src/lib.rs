//! View synchronizer for dirsight.
//!
//! Derives a sorted, percentage-annotated [`ViewNode`] projection from the
//! latest scanned tree, keeps directory expansion across rescans by path,
//! and turns change signals into rescans.
//!
//! # Example
//!
//! ```rust,no_run
//! use dirsight_view::{SyncCommand, SyncConfig, SyncDriver, SyncUpdate};
//!
//! # async fn run() -> Result<(), dirsight_watch::WatchError> {
//! let (handle, mut updates) = SyncDriver::spawn(SyncConfig::default())?;
//! handle.send(SyncCommand::SetRoot("/home/user".into())).await;
//!
//! while let Some(update) = updates.recv().await {
//!     if let SyncUpdate::Projection(Some(view)) = update {
//!         for row in view.visible_rows() {
//!             println!("{:indent$}{} {}", "", row.node.name, row.node.display_size(), indent = row.depth * 2);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod driver;
mod expansion;
mod policy;
mod projection;
mod sort;
mod synchronizer;

pub use config::{DEFAULT_SETTLE, SyncConfig, SyncConfigBuilder};
pub use driver::{
    COMMAND_CHANNEL_SIZE, SyncCommand, SyncDriver, SyncHandle, SyncUpdate, UPDATE_CHANNEL_SIZE,
};
pub use expansion::ExpansionState;
pub use policy::RescanPolicy;
pub use projection::{ViewNode, VisibleRow, project};
pub use sort::{SortColumn, SortSpec};
pub use synchronizer::{ScanResolution, ViewSynchronizer};

pub use dirsight_core::format_size;
