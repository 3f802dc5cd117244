//! End-to-end driver tests over an in-memory filesystem and a hand-fed
//! watch backend.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dirsight_core::ScanConfig;
use dirsight_scan::{MemoryFileSystem, ScanSession, TreeScanner};
use dirsight_view::{SortColumn, SyncCommand, SyncConfig, SyncDriver, SyncHandle, SyncUpdate, ViewNode};
use dirsight_watch::{
    ChangeKind, ChangeMonitor, RawEvent, RawSender, WatchBackend, WatchConfig, WatchError,
    raw_channel,
};
use tokio::sync::mpsc;

#[derive(Default)]
struct Subscriptions {
    watched: Vec<PathBuf>,
    unwatched: Vec<PathBuf>,
}

struct FakeBackend {
    subs: Arc<Mutex<Subscriptions>>,
}

impl WatchBackend for FakeBackend {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.subs.lock().unwrap().watched.push(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.subs.lock().unwrap().unwatched.push(path.to_path_buf());
        Ok(())
    }
}

struct Harness {
    handle: SyncHandle,
    updates: mpsc::Receiver<SyncUpdate>,
    raw: RawSender,
    subs: Arc<Mutex<Subscriptions>>,
}

fn data_fs() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_file("/data/f1", 100)
        .with_file("/data/sub/f2", 924)
        .with_denied_dir("/data/locked")
}

fn harness() -> Harness {
    let subs = Arc::new(Mutex::new(Subscriptions::default()));
    let (raw, raw_rx) = raw_channel();
    let backend = FakeBackend {
        subs: Arc::clone(&subs),
    };
    let (monitor, changes) = ChangeMonitor::start(
        WatchConfig::with_debounce(Duration::from_millis(10)),
        backend,
        raw_rx,
    );

    let config = SyncConfig::builder()
        .settle(Duration::from_millis(40))
        .debounce(Duration::from_millis(10))
        .scan(ScanConfig::new("/"))
        .build()
        .unwrap();
    let session = ScanSession::with_scanner(TreeScanner::with_fs(data_fs()));
    let (handle, updates) = SyncDriver::spawn_with(config, session, monitor, changes);

    Harness {
        handle,
        updates,
        raw,
        subs,
    }
}

async fn next_update(updates: &mut mpsc::Receiver<SyncUpdate>) -> Option<SyncUpdate> {
    tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("no update within timeout")
}

/// Skip progress ticks and empty projections until a snapshot arrives.
async fn next_view(updates: &mut mpsc::Receiver<SyncUpdate>) -> ViewNode {
    loop {
        match next_update(updates).await {
            Some(SyncUpdate::Projection(Some(view))) => return view,
            Some(SyncUpdate::ScanFailed(message)) => panic!("scan failed: {message}"),
            Some(_) => continue,
            None => panic!("driver stopped"),
        }
    }
}

#[tokio::test]
async fn test_set_root_delivers_projection() {
    let mut h = harness();
    assert!(h.handle.send(SyncCommand::SetRoot("/data".into())).await);

    match next_update(&mut h.updates).await {
        Some(SyncUpdate::Projection(None)) => {}
        other => panic!("expected an empty projection first, got {other:?}"),
    }

    let view = next_view(&mut h.updates).await;
    assert_eq!(view.path, PathBuf::from("/data"));
    assert_eq!(view.size, 1024);
    assert_eq!(view.file_count, 2);
    assert!(view.expanded);

    // Largest first by default; the errored directory is still listed.
    let names: Vec<&str> = view.children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["sub", "locked"]);
    assert!(view.children[1].is_errored());

    assert_eq!(h.subs.lock().unwrap().watched, vec![PathBuf::from("/data")]);
    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_sort_and_expand_commands() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data".into())).await;
    next_view(&mut h.updates).await;

    h.handle.send(SyncCommand::Sort(SortColumn::Name)).await;
    let view = next_view(&mut h.updates).await;
    assert_eq!(view.children[0].name, "locked");

    h.handle.send(SyncCommand::Expand("/data/sub".into())).await;
    let view = next_view(&mut h.updates).await;
    assert!(view.find(Path::new("/data/sub")).unwrap().expanded);
    assert_eq!(view.visible_rows().len(), 3);

    h.handle.send(SyncCommand::Toggle("/data".into())).await;
    let view = next_view(&mut h.updates).await;
    assert!(!view.expanded);
    assert_eq!(view.visible_rows().len(), 1);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_change_signal_triggers_rescan() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data".into())).await;
    next_view(&mut h.updates).await;

    h.handle.send(SyncCommand::Expand("/data/sub".into())).await;
    next_view(&mut h.updates).await;

    h.raw
        .send(RawEvent::new(ChangeKind::Created, ["/data/sub/newfile.txt"]))
        .unwrap();

    // The rescan produces a fresh projection with expansion intact.
    let view = next_view(&mut h.updates).await;
    assert!(view.find(Path::new("/data/sub")).unwrap().expanded);
    assert_eq!(view.size, 1024);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_collapsed_node_stays_collapsed_across_rescans() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data".into())).await;
    next_view(&mut h.updates).await;

    h.handle.send(SyncCommand::Expand("/data/sub".into())).await;
    next_view(&mut h.updates).await;
    h.handle.send(SyncCommand::Refresh).await;
    let view = next_view(&mut h.updates).await;
    assert!(view.find(Path::new("/data/sub")).unwrap().expanded);

    h.handle.send(SyncCommand::Collapse("/data/sub".into())).await;
    let view = next_view(&mut h.updates).await;
    assert!(!view.find(Path::new("/data/sub")).unwrap().expanded);

    h.handle.send(SyncCommand::Refresh).await;
    let view = next_view(&mut h.updates).await;
    assert!(!view.find(Path::new("/data/sub")).unwrap().expanded);
    assert!(view.expanded);

    h.raw
        .send(RawEvent::new(ChangeKind::Modified, ["/data/sub/f2"]))
        .unwrap();
    let view = next_view(&mut h.updates).await;
    assert!(!view.find(Path::new("/data/sub")).unwrap().expanded);
    assert_eq!(view.visible_rows().len(), 3);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_change_outside_root_is_ignored() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data/sub".into())).await;
    next_view(&mut h.updates).await;

    h.raw
        .send(RawEvent::new(ChangeKind::Modified, ["/data/f1"]))
        .unwrap();

    let quiet = tokio::time::timeout(Duration::from_millis(300), h.updates.recv()).await;
    assert!(quiet.is_err(), "unexpected update: {quiet:?}");
    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_root_reports_failure() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/missing".into())).await;

    loop {
        match next_update(&mut h.updates).await {
            Some(SyncUpdate::ScanFailed(message)) => {
                assert!(message.contains("/missing"), "{message}");
                break;
            }
            Some(SyncUpdate::Projection(Some(_))) => panic!("no snapshot expected"),
            Some(_) => continue,
            None => panic!("driver stopped"),
        }
    }
    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_new_root_replaces_watch() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data".into())).await;
    next_view(&mut h.updates).await;

    h.handle.send(SyncCommand::SetRoot("/data/sub".into())).await;
    let view = next_view(&mut h.updates).await;
    assert_eq!(view.size, 924);

    let subs = h.subs.lock().unwrap();
    assert_eq!(
        subs.watched,
        vec![PathBuf::from("/data"), PathBuf::from("/data/sub")]
    );
    assert_eq!(subs.unwatched, vec![PathBuf::from("/data")]);
    drop(subs);

    h.handle.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_updates() {
    let mut h = harness();
    h.handle.send(SyncCommand::SetRoot("/data".into())).await;
    h.handle.shutdown().await;

    while next_update(&mut h.updates).await.is_some() {}
}
