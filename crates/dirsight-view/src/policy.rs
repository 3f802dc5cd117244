//! When a change signal turns into a rescan.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

/// A settle is never pushed back further than this many settle delays past
/// its first change.
const MAX_LATENCY_FACTOR: u32 = 4;

/// Rescan scheduling for one tracked root.
///
/// A change under the root arms a settle deadline; later changes push it
/// back, but no further than four settle delays past the first one. When the deadline passes and no scan is running, one full rescan
/// starts. Changes seen while a scan runs set a single pending flag, and
/// the scan's completion arms one follow-up settle. Nothing is queued
/// deeper than that.
#[derive(Debug, Clone)]
pub struct RescanPolicy {
    settle: Duration,
    root: Option<PathBuf>,
    deadline: Option<Instant>,
    settle_started: Option<Instant>,
    running: bool,
    pending: bool,
}

impl RescanPolicy {
    /// Create a policy with the given settle delay and no root.
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            root: None,
            deadline: None,
            settle_started: None,
            running: false,
            pending: false,
        }
    }

    /// Track a new root, dropping any scheduled work for the old one.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = Some(root.into());
        self.deadline = None;
        self.settle_started = None;
        self.pending = false;
    }

    /// Root currently tracked.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Record a change signal. Returns `false` if the path is outside the
    /// tracked root and was ignored.
    pub fn on_change(&mut self, path: &Path, now: Instant) -> bool {
        let Some(root) = &self.root else {
            return false;
        };
        if !path.starts_with(root) {
            return false;
        }

        if self.running {
            self.pending = true;
        } else {
            let first = *self.settle_started.get_or_insert(now);
            let cap = first + self.settle * MAX_LATENCY_FACTOR;
            self.deadline = Some((now + self.settle).min(cap));
        }
        true
    }

    /// Check the deadline. Returns `true` when a rescan should start now;
    /// the policy then considers it running.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if !self.running && deadline <= now => {
                self.deadline = None;
                self.settle_started = None;
                self.running = true;
                true
            }
            _ => false,
        }
    }

    /// A scan was started outside the policy (new root or explicit refresh).
    /// It covers every change seen so far.
    pub fn scan_started(&mut self) {
        self.running = true;
        self.deadline = None;
        self.settle_started = None;
        self.pending = false;
    }

    /// The running scan ended, whatever its outcome.
    pub fn scan_finished(&mut self, now: Instant) {
        self.running = false;
        if std::mem::take(&mut self.pending) {
            self.settle_started = Some(now);
            self.deadline = Some(now + self.settle);
        }
    }

    /// Next instant at which [`poll`](Self::poll) may fire.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.running { None } else { self.deadline }
    }

    /// Check if a scan is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Check if a follow-up rescan is owed once the running scan ends.
    pub fn is_pending(&self) -> bool {
        self.pending
    }
}
