//! Background scanning.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use dirsight_core::{ScanConfig, ScanError, ScanOutcome};

use crate::fs::{FileSystem, OsFileSystem};
use crate::progress::ScanProgress;
use crate::scanner::TreeScanner;

/// Channel buffer size for scan events.
pub const SCAN_CHANNEL_SIZE: usize = 100;

/// Message delivered by a background scan.
#[derive(Debug)]
pub enum ScanEvent {
    /// Progress update. Dropped rather than queued if the receiver lags.
    Progress(ScanProgress),
    /// Final result; always the last message of a run.
    Finished(Result<ScanOutcome, ScanError>),
}

struct RunningScan {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the single in-flight scan.
///
/// Starting a scan cancels the previous one first. Each run gets its own
/// receiver, so a superseded run can never deliver into the new one.
pub struct ScanSession<F = OsFileSystem> {
    scanner: Arc<TreeScanner<F>>,
    current: Option<RunningScan>,
}

impl ScanSession {
    /// Create a session scanning the real filesystem.
    pub fn new() -> Self {
        Self::with_scanner(TreeScanner::new())
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem + 'static> ScanSession<F> {
    /// Create a session around an existing scanner.
    pub fn with_scanner(scanner: TreeScanner<F>) -> Self {
        Self {
            scanner: Arc::new(scanner),
            current: None,
        }
    }

    /// Get the scanner used for every run.
    pub fn scanner(&self) -> &TreeScanner<F> {
        &self.scanner
    }

    /// Start a background scan, cancelling any scan still running.
    ///
    /// Must be called from within a tokio runtime. The receiver yields any
    /// number of [`ScanEvent::Progress`] followed by exactly one
    /// [`ScanEvent::Finished`].
    pub fn start(&mut self, config: ScanConfig) -> mpsc::Receiver<ScanEvent> {
        self.cancel();

        let (tx, rx) = mpsc::channel(SCAN_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let scanner = Arc::clone(&self.scanner);

        debug!(root = %config.root.display(), "starting background scan");
        let handle = tokio::spawn(async move {
            let progress_tx = tx.clone();

            // The scanner is blocking and uses rayon internally.
            let result = tokio::task::spawn_blocking(move || {
                scanner.scan_with(
                    &config,
                    |progress| {
                        let _ = progress_tx.try_send(ScanEvent::Progress(progress));
                    },
                    &token,
                )
            })
            .await
            .unwrap_or_else(|e| {
                Err(ScanError::TaskFailed {
                    message: e.to_string(),
                })
            });

            let _ = tx.send(ScanEvent::Finished(result)).await;
        });

        self.current = Some(RunningScan { cancel, handle });
        rx
    }

    /// Cancel the in-flight scan, if any. Its receiver gets
    /// `Finished(Ok(Cancelled))` once the walk notices.
    pub fn cancel(&mut self) {
        if let Some(run) = self.current.take() {
            run.cancel.cancel();
        }
    }

    /// Check if a scan is still running.
    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }
}

impl<F> Drop for ScanSession<F> {
    fn drop(&mut self) {
        if let Some(run) = self.current.take() {
            run.cancel.cancel();
        }
    }
}
