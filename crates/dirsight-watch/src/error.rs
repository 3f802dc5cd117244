//! Error types for the change monitor.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while watching for changes.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The backend refused to subscribe to a path. Other watched paths keep
    /// working.
    #[error("Failed to watch {path}: {source}")]
    SubscriptionFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The backend could not drop a subscription.
    #[error("Failed to unwatch {path}: {source}")]
    UnsubscribeFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// The platform watcher could not be created.
    #[error("Failed to initialize file watcher: {0}")]
    BackendInit(#[source] notify::Error),
}

impl WatchError {
    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::SubscriptionFailed { path, .. } | Self::UnsubscribeFailed { path, .. } => {
                Some(path)
            }
            Self::BackendInit(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_error_message() {
        let err = WatchError::SubscriptionFailed {
            path: PathBuf::from("/data"),
            source: notify::Error::path_not_found(),
        };
        assert!(err.to_string().starts_with("Failed to watch /data"));
        assert_eq!(err.path(), Some(&PathBuf::from("/data")));
    }

    #[test]
    fn test_backend_init_has_no_path() {
        let err = WatchError::BackendInit(notify::Error::generic("no inotify"));
        assert!(err.path().is_none());
        assert!(err.to_string().contains("no inotify"));
    }
}
