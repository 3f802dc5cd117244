//! Error types for scanning operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that fail a whole scan.
///
/// Failures below the root never show up here; they are recorded on the
/// affected [`DirectoryNode`](crate::DirectoryNode) instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root path could not be opened at all.
    #[error("Cannot open scan root {path}: {source}")]
    RootUnreachable {
        path: PathBuf,
        #[source]
        source: FsError,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The background scan task died.
    #[error("Scan task failed: {message}")]
    TaskFailed { message: String },
}

/// Errors reported by a filesystem access layer.
#[derive(Debug, Error)]
pub enum FsError {
    /// Permission denied for a path.
    #[error("Access denied: {path}")]
    AccessDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Any other I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Classify an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Check if this is an access-denied error.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Short message recorded on a node that failed with this error.
    pub fn node_message(&self) -> String {
        match self {
            Self::AccessDenied { .. } => "Access denied".to_string(),
            Self::NotFound { .. } => "Not found".to_string(),
            Self::Io { source, .. } => format!("Scan error: {source}"),
        }
    }
}
