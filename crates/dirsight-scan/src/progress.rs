//! Scan progress reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Progress information during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanProgress {
    /// Number of files scanned so far in this run.
    pub files_scanned: u64,
    /// Number of directories entered so far.
    pub dirs_scanned: u64,
    /// Total bytes counted so far.
    pub bytes_scanned: u64,
    /// Directory being scanned when this report was taken.
    pub current_path: PathBuf,
    /// Number of directories that failed so far.
    pub errors_count: u64,
    /// Time elapsed since scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_scanned: 0,
            bytes_scanned: 0,
            current_path: PathBuf::new(),
            errors_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Run-scoped counters shared by all scanning threads.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    interval: u64,
    files_scanned: AtomicU64,
    dirs_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    errors_count: AtomicU64,
    last_reported: Mutex<u64>,
}

impl ProgressTracker {
    pub fn new(interval: u64) -> Self {
        Self {
            start_time: Instant::now(),
            interval: interval.max(1),
            files_scanned: AtomicU64::new(0),
            dirs_scanned: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            last_reported: Mutex::new(0),
        }
    }

    /// Count one file. Returns the file count when a progress report is due.
    pub fn record_file(&self, size: u64) -> Option<u64> {
        self.bytes_scanned.fetch_add(size, Ordering::Relaxed);
        let count = self.files_scanned.fetch_add(1, Ordering::Relaxed) + 1;
        (count % self.interval == 0).then_some(count)
    }

    /// Deliver the report for `files_scanned` unless a later one already went
    /// out. Reports reach `on_progress` one at a time, in increasing order.
    pub fn report<P>(&self, files_scanned: u64, current_path: &Path, on_progress: &P)
    where
        P: Fn(ScanProgress) + ?Sized,
    {
        let mut last = self
            .last_reported
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if files_scanned <= *last {
            return;
        }
        *last = files_scanned;
        on_progress(self.snapshot(files_scanned, current_path.to_path_buf()));
    }

    pub fn record_dir(&self) {
        self.dirs_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, files_scanned: u64, current_path: PathBuf) -> ScanProgress {
        ScanProgress {
            files_scanned,
            dirs_scanned: self.dirs_scanned.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            current_path,
            errors_count: self.errors_count.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }
}
