//! The change monitor task and its handle.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace, warn};

use crate::backend::{NotifyBackend, RawReceiver, WatchBackend};
use crate::config::WatchConfig;
use crate::debounce::Debouncer;
use crate::error::WatchError;

/// How long the listener sleeps when nothing is pending.
const IDLE_WAKE: Duration = Duration::from_secs(86400);

/// Stream of directories whose contents changed.
///
/// Ends once the monitor is shut down or dropped. Signals still buffered at
/// that point are discarded.
#[derive(Debug)]
pub struct ChangeStream {
    inner: ReceiverStream<PathBuf>,
    cancel: CancellationToken,
}

impl ChangeStream {
    /// Wait for the next changed directory.
    pub async fn next_change(&mut self) -> Option<PathBuf> {
        self.inner.next().await
    }
}

impl Stream for ChangeStream {
    type Item = PathBuf;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<PathBuf>> {
        if self.cancel.is_cancelled() {
            self.inner.close();
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Handle to a running change monitor.
///
/// Owns the backend and the set of watched roots. Dropping the handle stops
/// the listener; [`shutdown`](Self::shutdown) additionally waits for it.
pub struct ChangeMonitor<B = NotifyBackend> {
    backend: B,
    watched: BTreeSet<PathBuf>,
    guard: DropGuard,
    task: JoinHandle<()>,
}

impl ChangeMonitor<NotifyBackend> {
    /// Start a monitor on the platform watcher with nothing watched yet.
    pub fn notify(config: WatchConfig) -> Result<(Self, ChangeStream), WatchError> {
        let (backend, raw) = NotifyBackend::new()?;
        Ok(Self::start(config, backend, raw))
    }
}

impl<B: WatchBackend> ChangeMonitor<B> {
    /// Start listening on `raw`, the event channel belonging to `backend`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: WatchConfig, backend: B, raw: RawReceiver) -> (Self, ChangeStream) {
        let (tx, rx) = mpsc::channel(config.channel_size.max(1));
        let cancel = CancellationToken::new();
        let debouncer = Debouncer::new(config.debounce, config.max_wait);

        let task = tokio::spawn(listen(raw, tx, debouncer, cancel.clone()));

        let monitor = Self {
            backend,
            watched: BTreeSet::new(),
            guard: cancel.clone().drop_guard(),
            task,
        };
        let stream = ChangeStream {
            inner: ReceiverStream::new(rx),
            cancel: cancel.clone(),
        };
        (monitor, stream)
    }

    /// Watch everything below `path`.
    ///
    /// Watching a path twice is a no-op. A failure is logged and returned;
    /// paths already watched are unaffected.
    pub fn add_path(&mut self, path: impl Into<PathBuf>) -> Result<(), WatchError> {
        let path = path.into();
        if self.watched.contains(&path) {
            return Ok(());
        }

        if let Err(err) = self.backend.watch(&path) {
            warn!(path = %path.display(), error = %err, "watch subscription failed");
            return Err(err);
        }

        debug!(path = %path.display(), "watching");
        self.watched.insert(path);
        Ok(())
    }

    /// Stop watching `path`. Returns `false` if it was not watched.
    pub fn remove_path(&mut self, path: &Path) -> Result<bool, WatchError> {
        if !self.watched.contains(path) {
            return Ok(false);
        }

        self.backend.unwatch(path)?;
        self.watched.remove(path);
        debug!(path = %path.display(), "stopped watching");
        Ok(true)
    }

    /// Paths currently watched.
    pub fn watched(&self) -> impl Iterator<Item = &Path> {
        self.watched.iter().map(PathBuf::as_path)
    }

    /// Check if `path` is watched.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Stop the monitor and release every subscription.
    ///
    /// Once this returns the listener has exited and the stream yields
    /// nothing more, including signals it had already buffered.
    pub async fn shutdown(self) {
        let Self {
            backend,
            guard,
            task,
            ..
        } = self;

        drop(guard);
        drop(backend);
        if let Err(e) = task.await {
            warn!(error = %e, "change monitor task failed");
        }
        debug!("change monitor shut down");
    }
}

impl<B> std::fmt::Debug for ChangeMonitor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeMonitor")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

/// Watch `paths` with the platform watcher and default settings.
///
/// Paths that cannot be watched are logged and skipped. Only a watcher that
/// cannot be created at all is an error.
pub fn watch_changes<I, P>(paths: I) -> Result<(ChangeMonitor, ChangeStream), WatchError>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let (mut monitor, stream) = ChangeMonitor::notify(WatchConfig::default())?;
    for path in paths {
        // Already logged by add_path.
        let _ = monitor.add_path(path);
    }
    Ok((monitor, stream))
}

async fn listen(
    mut raw: RawReceiver,
    out: mpsc::Sender<PathBuf>,
    mut debouncer: Debouncer,
    cancel: CancellationToken,
) {
    loop {
        let wake = debouncer
            .next_due()
            .unwrap_or_else(|| Instant::now() + IDLE_WAKE);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = raw.recv() => match event {
                Some(event) => {
                    trace!(kind = ?event.kind, paths = ?event.paths, "raw event");
                    let now = Instant::now();
                    for path in &event.paths {
                        debouncer.record(path, now);
                    }
                }
                None => {
                    // The backend is gone; flush and stop.
                    for dir in debouncer.drain() {
                        if !emit(&out, dir, &cancel).await {
                            return;
                        }
                    }
                    break;
                }
            },
            _ = tokio::time::sleep_until(wake) => {
                for dir in debouncer.take_due(Instant::now()) {
                    if !emit(&out, dir, &cancel).await {
                        return;
                    }
                }
            }
        }
    }
    debug!("change listener stopped");
}

/// Send one change. Returns `false` once the monitor should stop.
async fn emit(out: &mpsc::Sender<PathBuf>, dir: PathBuf, cancel: &CancellationToken) -> bool {
    trace!(dir = %dir.display(), "directory changed");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = out.send(dir) => sent.is_ok(),
    }
}
