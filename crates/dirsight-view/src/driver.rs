//! Async task wiring scans, change signals and the synchronizer together.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use dirsight_core::ScanConfig;
use dirsight_scan::{FileSystem, OsFileSystem, ScanEvent, ScanProgress, ScanSession};
use dirsight_watch::{
    ChangeMonitor, ChangeStream, NotifyBackend, WatchBackend, WatchConfig, WatchError,
};

use crate::config::SyncConfig;
use crate::projection::ViewNode;
use crate::sort::SortColumn;
use crate::synchronizer::{ScanResolution, ViewSynchronizer};

/// Channel buffer size for consumer commands.
pub const COMMAND_CHANNEL_SIZE: usize = 32;

/// Channel buffer size for updates to the consumer.
pub const UPDATE_CHANNEL_SIZE: usize = 100;

const IDLE_WAKE: Duration = Duration::from_secs(86400);

/// Request from the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncCommand {
    /// Watch and scan a new root, replacing the current one.
    SetRoot(PathBuf),
    /// Select a sort column; selecting the current one flips direction.
    Sort(SortColumn),
    Expand(PathBuf),
    Collapse(PathBuf),
    Toggle(PathBuf),
    /// Rescan now, replacing any running scan.
    Refresh,
    /// Cancel the running scan and keep the current snapshot.
    Cancel,
    Shutdown,
}

/// Message delivered to the consumer.
#[derive(Debug, Clone)]
pub enum SyncUpdate {
    /// The running scan advanced. Dropped rather than queued if the
    /// consumer lags.
    Progress(ScanProgress),
    /// Fresh projection to render. `None` while a new root has no snapshot.
    Projection(Option<ViewNode>),
    /// A scan failed; the previous projection is still valid.
    ScanFailed(String),
    /// A scan was cancelled; the previous projection is still valid.
    Cancelled,
}

/// Handle held by the consumer.
#[derive(Debug)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Send a command. Returns `false` once the driver has stopped.
    pub async fn send(&self, command: SyncCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// Stop the driver and wait for it. The running scan is cancelled and
    /// every watch subscription released.
    pub async fn shutdown(self) {
        let _ = self.commands.send(SyncCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "sync driver task failed");
        }
    }
}

/// Runs a [`ViewSynchronizer`] on its own task.
///
/// Scans run on the blocking pool through a [`ScanSession`], change signals
/// come from a [`ChangeMonitor`], and the consumer talks to the driver only
/// through channels, so it is never blocked by either.
pub struct SyncDriver<F = OsFileSystem, B = NotifyBackend> {
    sync: ViewSynchronizer,
    session: ScanSession<F>,
    monitor: ChangeMonitor<B>,
    changes: ChangeStream,
    scan_events: Option<mpsc::Receiver<ScanEvent>>,
    updates: mpsc::Sender<SyncUpdate>,
}

impl SyncDriver {
    /// Spawn a driver over the real filesystem and the platform watcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: SyncConfig,
    ) -> Result<(SyncHandle, mpsc::Receiver<SyncUpdate>), WatchError> {
        let watch = WatchConfig::with_debounce(config.debounce);
        let (monitor, changes) = ChangeMonitor::notify(watch)?;
        Ok(Self::spawn_with(config, ScanSession::new(), monitor, changes))
    }
}

impl<F, B> SyncDriver<F, B>
where
    F: FileSystem + 'static,
    B: WatchBackend,
{
    /// Spawn a driver around an existing session and monitor.
    pub fn spawn_with(
        config: SyncConfig,
        session: ScanSession<F>,
        monitor: ChangeMonitor<B>,
        changes: ChangeStream,
    ) -> (SyncHandle, mpsc::Receiver<SyncUpdate>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_SIZE);

        let driver = Self {
            sync: ViewSynchronizer::new(config),
            session,
            monitor,
            changes,
            scan_events: None,
            updates: update_tx,
        };
        let task = tokio::spawn(driver.run(command_rx));

        let handle = SyncHandle {
            commands: command_tx,
            task,
        };
        (handle, update_rx)
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SyncCommand>) {
        loop {
            let wake = self
                .sync
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_WAKE);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(SyncCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = next_scan_event(&mut self.scan_events) => {
                    self.handle_scan_event(event).await;
                }
                Some(dir) = self.changes.next_change() => {
                    self.sync.on_change(&dir, Instant::now());
                }
                _ = tokio::time::sleep_until(wake) => {
                    if let Some(config) = self.sync.poll(Instant::now()) {
                        self.start_scan(config);
                    }
                }
            }
        }

        self.session.cancel();
        self.monitor.shutdown().await;
        debug!("sync driver stopped");
    }

    async fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::SetRoot(root) => self.set_root(root).await,
            SyncCommand::Sort(column) => {
                self.sync.sort_by(column);
                self.publish_projection().await;
            }
            SyncCommand::Expand(path) => {
                self.sync.expand(path);
                self.publish_projection().await;
            }
            SyncCommand::Collapse(path) => {
                self.sync.collapse(&path);
                self.publish_projection().await;
            }
            SyncCommand::Toggle(path) => {
                self.sync.toggle(&path);
                self.publish_projection().await;
            }
            SyncCommand::Refresh => {
                if let Some(config) = self.sync.refresh() {
                    self.start_scan(config);
                }
            }
            // The receiver stays, so the run reports Finished(Cancelled).
            SyncCommand::Cancel => self.session.cancel(),
            SyncCommand::Shutdown => {}
        }
    }

    async fn set_root(&mut self, root: PathBuf) {
        let root = self
            .session
            .scanner()
            .fs()
            .canonicalize(&root)
            .unwrap_or(root);

        if let Some(old) = self.sync.root().map(Path::to_path_buf)
            && old != root
            && let Err(e) = self.monitor.remove_path(&old)
        {
            warn!(path = %old.display(), error = %e, "failed to unwatch old root");
        }
        // Failures are logged by the monitor; the scan still runs.
        let _ = self.monitor.add_path(root.clone());

        let config = self.sync.set_root(root);
        self.publish(SyncUpdate::Projection(None)).await;
        self.start_scan(config);
    }

    fn start_scan(&mut self, config: ScanConfig) {
        // Dropping the previous receiver discards whatever the replaced run
        // still has to say.
        self.scan_events = Some(self.session.start(config));
    }

    async fn handle_scan_event(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Progress(progress) => {
                self.sync.on_progress(progress.clone());
                let _ = self.updates.try_send(SyncUpdate::Progress(progress));
            }
            ScanEvent::Finished(result) => {
                self.scan_events = None;
                match self.sync.on_scan_finished(result, Instant::now()) {
                    ScanResolution::Updated => self.publish_projection().await,
                    ScanResolution::Cancelled => self.publish(SyncUpdate::Cancelled).await,
                    ScanResolution::Failed(message) => {
                        self.publish(SyncUpdate::ScanFailed(message)).await
                    }
                }
            }
        }
    }

    async fn publish_projection(&mut self) {
        let projection = self.sync.projection();
        self.publish(SyncUpdate::Projection(projection)).await;
    }

    async fn publish(&mut self, update: SyncUpdate) {
        if self.updates.send(update).await.is_err() {
            debug!("update receiver dropped");
        }
    }
}

async fn next_scan_event(events: &mut Option<mpsc::Receiver<ScanEvent>>) -> Option<ScanEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
