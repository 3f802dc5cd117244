//! Per-directory debouncing of raw events.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

/// Directory whose aggregate a change at `path` affects.
///
/// This is the parent of `path`, or `path` itself when it has none.
pub fn containing_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

/// Collapses bursts of events into one signal per directory.
///
/// A directory becomes due `window` after its most recent event, but never
/// later than `max_wait` after the first event of the burst. Time is passed
/// in explicitly so the monitor task owns the clock.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    max_wait: Duration,
    pending: HashMap<PathBuf, Burst>,
}

#[derive(Debug, Clone, Copy)]
struct Burst {
    first: Instant,
    due: Instant,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window and latency cap.
    pub fn new(window: Duration, max_wait: Duration) -> Self {
        Self {
            window,
            max_wait: max_wait.max(window),
            pending: HashMap::new(),
        }
    }

    /// Record a change to `path`, seen at `now`.
    pub fn record(&mut self, path: &Path, now: Instant) {
        let quiet = now + self.window;
        self.pending
            .entry(containing_dir(path))
            .and_modify(|burst| burst.due = quiet.min(burst.first + self.max_wait))
            .or_insert(Burst {
                first: now,
                due: quiet,
            });
    }

    /// Earliest instant at which some directory becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|burst| burst.due).min()
    }

    /// Remove and return every directory due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut ready: Vec<(Instant, PathBuf)> = self
            .pending
            .iter()
            .filter(|(_, burst)| burst.due <= now)
            .map(|(dir, burst)| (burst.due, dir.clone()))
            .collect();
        ready.sort();

        for (_, dir) in &ready {
            self.pending.remove(dir);
        }
        ready.into_iter().map(|(_, dir)| dir).collect()
    }

    /// Remove and return everything still waiting, earliest first.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        let mut pending: Vec<(Instant, PathBuf)> = self
            .pending
            .drain()
            .map(|(dir, burst)| (burst.due, dir))
            .collect();
        pending.sort();
        pending.into_iter().map(|(_, dir)| dir).collect()
    }

    /// Number of directories waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);
    const MAX_WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_containing_dir() {
        assert_eq!(
            containing_dir(Path::new("/data/sub/newfile.txt")),
            PathBuf::from("/data/sub")
        );
        assert_eq!(containing_dir(Path::new("/data/sub")), PathBuf::from("/data"));
        assert_eq!(containing_dir(Path::new("/")), PathBuf::from("/"));
        assert_eq!(containing_dir(Path::new("file")), PathBuf::from("file"));
    }

    #[test]
    fn test_burst_collapses_to_one() {
        let mut debouncer = Debouncer::new(WINDOW, MAX_WAIT);
        let start = Instant::now();

        for i in 0..50 {
            let path = PathBuf::from(format!("/data/archive/f{i}"));
            debouncer.record(&path, start + Duration::from_millis(i));
        }
        assert_eq!(debouncer.len(), 1);

        // Still inside the window of the last event.
        assert!(debouncer.take_due(start + WINDOW).is_empty());

        let due = debouncer.take_due(start + WINDOW + Duration::from_millis(49));
        assert_eq!(due, vec![PathBuf::from("/data/archive")]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_later_event_extends_window() {
        let mut debouncer = Debouncer::new(WINDOW, MAX_WAIT);
        let start = Instant::now();
        let path = Path::new("/data/a.txt");

        debouncer.record(path, start);
        debouncer.record(path, start + Duration::from_millis(400));
        assert_eq!(
            debouncer.next_due(),
            Some(start + Duration::from_millis(900))
        );
        assert!(debouncer.take_due(start + Duration::from_millis(600)).is_empty());
        assert_eq!(debouncer.take_due(start + Duration::from_millis(900)).len(), 1);
    }

    #[test]
    fn test_directories_are_independent() {
        let mut debouncer = Debouncer::new(WINDOW, MAX_WAIT);
        let start = Instant::now();

        debouncer.record(Path::new("/data/b/x"), start + Duration::from_millis(100));
        debouncer.record(Path::new("/data/a/x"), start);

        let due = debouncer.take_due(start + Duration::from_millis(550));
        assert_eq!(due, vec![PathBuf::from("/data/a")]);
        assert_eq!(debouncer.len(), 1);

        let due = debouncer.take_due(start + Duration::from_secs(1));
        assert_eq!(due, vec![PathBuf::from("/data/b")]);
    }

    #[test]
    fn test_drain_returns_everything() {
        let mut debouncer = Debouncer::new(WINDOW, MAX_WAIT);
        let start = Instant::now();
        debouncer.record(Path::new("/x/1"), start);
        debouncer.record(Path::new("/y/1"), start + Duration::from_millis(1));

        assert_eq!(
            debouncer.drain(),
            vec![PathBuf::from("/x"), PathBuf::from("/y")]
        );
        assert!(debouncer.next_due().is_none());
    }

    #[test]
    fn test_continuous_writes_still_emit() {
        let mut debouncer = Debouncer::new(WINDOW, MAX_WAIT);
        let start = Instant::now();
        let log = Path::new("/data/logs/app.log");

        let mut emitted = Vec::new();
        for tick in 0..150u32 {
            let now = start + Duration::from_millis(400) * tick;
            for dir in debouncer.take_due(now) {
                emitted.push((now, dir));
            }
            debouncer.record(log, now);
        }

        // One signal per max_wait, rounded up to the next event.
        assert_eq!(emitted.len(), 11);
        assert!(emitted.iter().all(|(_, dir)| dir == Path::new("/data/logs")));
        assert_eq!(emitted[0].0, start + Duration::from_millis(5200));
    }

    #[test]
    fn test_max_wait_caps_due_time() {
        let mut debouncer = Debouncer::new(WINDOW, Duration::from_secs(1));
        let start = Instant::now();
        let path = Path::new("/data/a.txt");

        debouncer.record(path, start);
        debouncer.record(path, start + Duration::from_millis(800));
        assert_eq!(debouncer.next_due(), Some(start + Duration::from_secs(1)));
    }

    #[test]
    fn test_max_wait_below_window_is_raised() {
        let mut debouncer = Debouncer::new(WINDOW, Duration::from_millis(10));
        let start = Instant::now();
        debouncer.record(Path::new("/data/a.txt"), start);
        assert_eq!(debouncer.next_due(), Some(start + WINDOW));
    }
}
