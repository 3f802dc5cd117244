//! Watch backends: the seam between the monitor and the platform watcher.

use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::WatchError;

/// Sending half of a raw event channel.
pub type RawSender = mpsc::UnboundedSender<RawEvent>;

/// Receiving half of a raw event channel.
pub type RawReceiver = mpsc::UnboundedReceiver<RawEvent>;

/// Create a raw event channel for a backend.
pub fn raw_channel() -> (RawSender, RawReceiver) {
    mpsc::unbounded_channel()
}

/// Kind of filesystem change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    /// The backend saw a change but could not tell which kind.
    Unknown,
}

/// A filesystem event as reported by a backend, before debouncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl RawEvent {
    /// Create a new raw event.
    pub fn new(kind: ChangeKind, paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            kind,
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Convert a notify event. Access and other non-mutating events give `None`.
    pub fn from_notify(event: notify::Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Any => ChangeKind::Unknown,
            EventKind::Access(_) | EventKind::Other => return None,
        };
        Some(Self {
            kind,
            paths: event.paths,
        })
    }
}

/// A source of filesystem change events.
///
/// Implementations deliver [`RawEvent`]s on a channel handed out at
/// construction. Dropping the backend releases every subscription.
pub trait WatchBackend: Send + 'static {
    /// Subscribe to changes anywhere below `path`.
    fn watch(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Drop the subscription for `path`.
    fn unwatch(&mut self, path: &Path) -> Result<(), WatchError>;
}

/// Backend using the platform's recommended notify watcher, in recursive mode.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl NotifyBackend {
    /// Create the platform watcher. Events arrive on the returned receiver.
    pub fn new() -> Result<(Self, RawReceiver), WatchError> {
        let (tx, rx) = raw_channel();

        // notify calls back from its own thread.
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if let Some(raw) = RawEvent::from_notify(event) {
                        let _ = tx.send(raw);
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            }
        })
        .map_err(WatchError::BackendInit)?;

        Ok((Self { watcher }, rx))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(|source| WatchError::SubscriptionFailed {
                path: path.to_path_buf(),
                source,
            })
    }

    fn unwatch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .unwatch(path)
            .map_err(|source| WatchError::UnsubscribeFailed {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}
