//! Filesystem change monitor for dirsight.
//!
//! Turns raw filesystem events into a stream of directories whose aggregate
//! size may be stale. Every event is mapped to the directory containing the
//! changed entry, and bursts for the same directory are collapsed into one
//! signal after a quiet window.
//!
//! # Example
//!
//! ```rust,no_run
//! use dirsight_watch::watch_changes;
//!
//! # async fn run() -> Result<(), dirsight_watch::WatchError> {
//! let (monitor, mut changes) = watch_changes(["/home/user"])?;
//!
//! while let Some(dir) = changes.next_change().await {
//!     println!("rescan {}", dir.display());
//! }
//!
//! monitor.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod backend;
mod config;
mod debounce;
mod error;
mod monitor;

pub use backend::{
    ChangeKind, NotifyBackend, RawEvent, RawReceiver, RawSender, WatchBackend, raw_channel,
};
pub use config::{
    DEFAULT_CHANNEL_SIZE, DEFAULT_DEBOUNCE, DEFAULT_MAX_WAIT, WatchConfig, WatchConfigBuilder,
};
pub use debounce::{Debouncer, containing_dir};
pub use error::WatchError;
pub use monitor::{ChangeMonitor, ChangeStream, watch_changes};
