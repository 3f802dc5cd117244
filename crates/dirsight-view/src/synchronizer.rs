//! Owner of the current snapshot and everything derived from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use dirsight_core::{DirectoryTree, ScanConfig, ScanError, ScanOutcome};
use dirsight_scan::ScanProgress;

use crate::config::SyncConfig;
use crate::expansion::ExpansionState;
use crate::policy::RescanPolicy;
use crate::projection::{ViewNode, project};
use crate::sort::{SortColumn, SortSpec};

/// What a finished scan did to the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResolution {
    /// A new snapshot replaced the old one.
    Updated,
    /// The scan was cancelled; the previous snapshot stays.
    Cancelled,
    /// The scan failed; the previous snapshot stays.
    Failed(String),
}

/// Bridges scan results, change signals, sort order and expansion state.
///
/// Performs no I/O. The caller starts a scan whenever a method hands back a
/// [`ScanConfig`] and reports the result through
/// [`on_scan_finished`](Self::on_scan_finished).
#[derive(Debug)]
pub struct ViewSynchronizer {
    scan: ScanConfig,
    root: Option<PathBuf>,
    snapshot: Option<Arc<DirectoryTree>>,
    sort: SortSpec,
    expansion: ExpansionState,
    policy: RescanPolicy,
    progress: Option<ScanProgress>,
    last_error: Option<String>,
}

impl ViewSynchronizer {
    /// Create a synchronizer with no root.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            scan: config.scan,
            root: None,
            snapshot: None,
            sort: config.sort,
            expansion: ExpansionState::new(),
            policy: RescanPolicy::new(config.settle),
            progress: None,
            last_error: None,
        }
    }

    /// Switch to a new root and request its first scan.
    ///
    /// The old snapshot is dropped and only the new root starts expanded.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) -> ScanConfig {
        let root = root.into();
        info!(root = %root.display(), "new root");

        self.snapshot = None;
        self.progress = None;
        self.last_error = None;
        self.expansion = ExpansionState::with_root(root.clone());
        self.policy.set_root(root.clone());
        self.root = Some(root);

        self.begin_scan()
    }

    /// Request an immediate full rescan of the current root.
    pub fn refresh(&mut self) -> Option<ScanConfig> {
        self.root.as_ref()?;
        Some(self.begin_scan())
    }

    fn begin_scan(&mut self) -> ScanConfig {
        self.policy.scan_started();
        self.progress = None;
        let root = self.root.clone().unwrap_or_else(|| self.scan.root.clone());
        self.scan.with_root(root)
    }

    /// Record a change signal from the monitor.
    pub fn on_change(&mut self, dir: &Path, now: Instant) -> bool {
        let accepted = self.policy.on_change(dir, now);
        if accepted {
            debug!(dir = %dir.display(), "change scheduled");
        }
        accepted
    }

    /// Check whether a scheduled rescan is due.
    pub fn poll(&mut self, now: Instant) -> Option<ScanConfig> {
        if !self.policy.poll(now) {
            return None;
        }
        debug!("settle delay elapsed, rescanning");
        self.progress = None;
        let root = self.root.clone()?;
        Some(self.scan.with_root(root))
    }

    /// Next instant at which [`poll`](Self::poll) may return a scan.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.policy.next_deadline()
    }

    /// Record progress of the running scan.
    pub fn on_progress(&mut self, progress: ScanProgress) {
        self.progress = Some(progress);
    }

    /// Apply the result of the running scan.
    pub fn on_scan_finished(
        &mut self,
        result: Result<ScanOutcome, ScanError>,
        now: Instant,
    ) -> ScanResolution {
        self.policy.scan_finished(now);
        self.progress = None;

        match result {
            Ok(ScanOutcome::Complete(tree)) => {
                self.snapshot = Some(Arc::new(tree));
                self.last_error = None;
                ScanResolution::Updated
            }
            Ok(ScanOutcome::Cancelled) => ScanResolution::Cancelled,
            Err(err) => {
                warn!(error = %err, "scan failed");
                let message = err.to_string();
                self.last_error = Some(message.clone());
                ScanResolution::Failed(message)
            }
        }
    }

    /// Project the current snapshot, if there is one.
    pub fn projection(&self) -> Option<ViewNode> {
        self.snapshot
            .as_ref()
            .map(|tree| project(&tree.root, self.sort, &self.expansion))
    }

    /// Select a sort column, flipping direction if it is already selected.
    pub fn sort_by(&mut self, column: SortColumn) {
        self.sort = self.sort.toggle(column);
    }

    /// Replace the sort order.
    pub fn set_sort(&mut self, sort: SortSpec) {
        self.sort = sort;
    }

    pub fn expand(&mut self, path: impl Into<PathBuf>) {
        self.expansion.expand(path);
    }

    pub fn collapse(&mut self, path: &Path) {
        self.expansion.collapse(path);
    }

    pub fn toggle(&mut self, path: &Path) -> bool {
        self.expansion.toggle(path)
    }

    pub fn expansion_mut(&mut self) -> &mut ExpansionState {
        &mut self.expansion
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Latest completed snapshot, possibly older than the running scan.
    pub fn snapshot(&self) -> Option<&Arc<DirectoryTree>> {
        self.snapshot.as_ref()
    }

    pub fn progress(&self) -> Option<&ScanProgress> {
        self.progress.as_ref()
    }

    /// Message of the last failed scan, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_scanning(&self) -> bool {
        self.policy.is_running()
    }
}
