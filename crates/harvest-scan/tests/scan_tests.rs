use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use harvest_scan::{
    FilterPolicy, MemoryFileSystem, Predicate, ScanConfig, ScanCoordinator, ScanError, ScanPhase,
    WarningKind,
};
use tempfile::TempDir;

const BUDGET: Duration = Duration::from_secs(10);

fn create_test_tree() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    fs::create_dir(root.join("S")).unwrap();
    fs::write(root.join("a.txt"), "alpha").unwrap();
    fs::write(root.join("b.java"), "class B {}").unwrap();
    fs::write(root.join("S/c.java"), "class C {}").unwrap();

    temp
}

/// A tree that lists slowly enough for the test thread to act mid-scan.
fn slow_tree(files: usize) -> MemoryFileSystem {
    let mut mem = MemoryFileSystem::new();
    for i in 0..files {
        mem.add_file(format!("/slow/d{i}/f{i}.txt"));
    }
    mem.with_latency(Duration::from_millis(20))
}

fn drain(coordinator: &ScanCoordinator<impl harvest_scan::FileSystem>) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    while let Ok(path) = coordinator.pop() {
        found.insert(path);
    }
    found
}

#[test]
fn test_java_files_under_any_policy() {
    let temp = create_test_tree();
    let root = temp.path();
    let config = ScanConfig::builder()
        .targets(vec![root.to_path_buf()])
        .extensions(vec![".java".to_string()])
        .policy(FilterPolicy::Any)
        .build()
        .unwrap();

    let coordinator = ScanCoordinator::new();
    coordinator.configure(&config).unwrap();
    coordinator.start().unwrap();
    coordinator
        .wait_until_finished(&coordinator.interrupter())
        .unwrap();

    let expected: BTreeSet<_> = [root.join("b.java"), root.join("S/c.java")].into();
    assert_eq!(drain(&coordinator), expected);
}

#[test]
fn test_two_extensions_under_all_policy_reject_everything() {
    let temp = create_test_tree();
    let coordinator = ScanCoordinator::new();
    coordinator.add_directory(temp.path()).unwrap();
    coordinator.add_filter(Predicate::extensions(["java"])).unwrap();
    coordinator.add_filter(Predicate::extensions(["xml"])).unwrap();
    coordinator.set_policy(FilterPolicy::All).unwrap();

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert!(coordinator.is_empty());
}

#[test]
fn test_depth_zero_scans_direct_children_only() {
    let temp = create_test_tree();
    let root = temp.path();
    let config = ScanConfig::builder()
        .targets(vec![root.to_path_buf()])
        .max_depth(Some(0))
        .build()
        .unwrap();

    let coordinator = ScanCoordinator::new();
    coordinator.configure(&config).unwrap();
    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let expected: BTreeSet<_> = [root.join("a.txt"), root.join("b.java")].into();
    assert_eq!(drain(&coordinator), expected);
}

#[test]
fn test_start_twice_runs_one_worker() {
    let coordinator = ScanCoordinator::with_filesystem(slow_tree(5));
    coordinator.add_directory("/slow").unwrap();

    assert!(coordinator.start().unwrap());
    assert!(!coordinator.start().unwrap());
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let snapshot = coordinator.snapshot();
    let unique: BTreeSet<_> = snapshot.iter().cloned().collect();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(unique.len(), 5);
}

#[test]
fn test_take_blocking_receives_first_push() {
    let coordinator = Arc::new(ScanCoordinator::with_filesystem(slow_tree(3)));
    coordinator.add_directory("/slow").unwrap();

    let (tx, rx) = mpsc::channel();
    let consumer = {
        let coordinator = Arc::clone(&coordinator);
        let interrupter = coordinator.interrupter();
        thread::spawn(move || {
            tx.send(coordinator.take_blocking(&interrupter)).unwrap();
        })
    };

    coordinator.start().unwrap();
    let taken = rx.recv_timeout(BUDGET).unwrap().unwrap();
    consumer.join().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let rest = coordinator.snapshot();
    assert_eq!(rest.len(), 2);
    assert!(!rest.contains(&taken));
    assert!(taken.starts_with("/slow"));
}

#[test]
fn test_lifecycle_transitions() {
    let coordinator = ScanCoordinator::with_filesystem(slow_tree(3));
    coordinator.add_directory("/slow").unwrap();
    assert_eq!(coordinator.phase(), ScanPhase::Idle);
    assert!(!coordinator.is_finished());

    coordinator.start().unwrap();
    assert!(!coordinator.is_finished());
    assert_eq!(coordinator.phase(), ScanPhase::Running);

    let interrupter = coordinator.interrupter();
    coordinator.wait_until_finished(&interrupter).unwrap();
    assert!(coordinator.is_finished());

    // Already finished: returns without blocking.
    coordinator.wait_until_finished(&interrupter).unwrap();
    assert!(coordinator.join());
}

#[test]
fn test_configuration_is_frozen_while_running() {
    let coordinator = ScanCoordinator::with_filesystem(slow_tree(3));
    coordinator.add_directory("/slow").unwrap();
    coordinator.start().unwrap();

    assert!(matches!(
        coordinator.set_max_depth(Some(1)),
        Err(ScanError::IllegalState { .. })
    ));
    assert!(matches!(
        coordinator.add_filter(Predicate::Visible),
        Err(ScanError::IllegalState { .. })
    ));
    assert!(matches!(
        coordinator.set_policy(FilterPolicy::All),
        Err(ScanError::IllegalState { .. })
    ));
    assert!(matches!(
        coordinator.configure(&ScanConfig::default()),
        Err(ScanError::IllegalState { .. })
    ));

    assert!(coordinator.wait_finished_timeout(BUDGET));
    coordinator.set_max_depth(Some(1)).unwrap();
    assert!(coordinator.add_filter(Predicate::Visible).unwrap());
}

#[test]
fn test_interrupt_cancels_blocked_take() {
    let temp = create_test_tree();
    let coordinator = Arc::new(ScanCoordinator::new());
    coordinator.add_directory(temp.path()).unwrap();
    coordinator
        .add_filter(Predicate::extensions(["nothing-has-this"]))
        .unwrap();
    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let interrupter = coordinator.interrupter();
    let consumer = {
        let coordinator = Arc::clone(&coordinator);
        let interrupter = interrupter.clone();
        thread::spawn(move || coordinator.take_blocking(&interrupter))
    };

    thread::sleep(Duration::from_millis(50));
    interrupter.interrupt();

    assert!(matches!(consumer.join().unwrap(), Err(ScanError::Cancelled)));
}

#[test]
fn test_interrupt_cancels_wait_until_finished() {
    let coordinator = Arc::new(ScanCoordinator::with_filesystem(
        slow_tree(20).with_latency(Duration::from_millis(100)),
    ));
    coordinator.add_directory("/slow").unwrap();
    coordinator.start().unwrap();

    let interrupter = coordinator.interrupter();
    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        let interrupter = interrupter.clone();
        thread::spawn(move || coordinator.wait_until_finished(&interrupter))
    };

    thread::sleep(Duration::from_millis(50));
    interrupter.interrupt();
    assert!(matches!(waiter.join().unwrap(), Err(ScanError::Cancelled)));

    coordinator.stop();
    assert!(coordinator.wait_finished_timeout(BUDGET));
}

#[test]
fn test_wait_before_start_blocks_until_finished() {
    let mut mem = MemoryFileSystem::new();
    for i in 0..5 {
        mem.add_file(format!("/r/d{i}/f{i}.txt"));
    }
    let coordinator = Arc::new(ScanCoordinator::with_filesystem(
        mem.with_latency(Duration::from_millis(50)),
    ));
    coordinator.add_directory("/r").unwrap();

    let waiter = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            let result = coordinator.wait_until_finished(&coordinator.interrupter());
            (result, coordinator.is_finished(), coordinator.len())
        })
    };

    thread::sleep(Duration::from_millis(30));
    assert!(!waiter.is_finished());
    coordinator.start().unwrap();

    let (result, finished, found) = waiter.join().unwrap();
    result.unwrap();
    assert!(finished);
    assert_eq!(found, 5);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_file_names_are_published_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    let real = temp.path().join(OsStr::from_bytes(b"bad\xffname.txt"));
    fs::write(&real, "x").unwrap();

    let coordinator = ScanCoordinator::new();
    coordinator.add_directory(temp.path()).unwrap();
    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let found = coordinator.snapshot();
    assert_eq!(found, vec![real]);
    assert!(found[0].exists());
}

#[test]
fn test_unreadable_subtree_is_skipped() {
    let mut mem = MemoryFileSystem::new();
    mem.add_file("/r/ok.txt")
        .add_file("/r/locked/secret.txt")
        .add_file("/r/open/fine.txt")
        .deny("/r/locked");

    let coordinator = ScanCoordinator::with_filesystem(mem);
    coordinator.add_directory("/r").unwrap();
    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let expected: BTreeSet<_> = [
        PathBuf::from("/r/ok.txt"),
        PathBuf::from("/r/open/fine.txt"),
    ]
    .into();
    assert_eq!(drain(&coordinator), expected);

    let warnings = coordinator.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].kind, WarningKind::PermissionDenied);
    assert_eq!(warnings[0].path, Path::new("/r/locked"));
}

#[test]
fn test_restart_accumulates_by_default() {
    let temp = create_test_tree();
    let coordinator = ScanCoordinator::new();
    coordinator.add_directory(temp.path()).unwrap();

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert_eq!(coordinator.len(), 3);

    assert!(coordinator.start().unwrap());
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert_eq!(coordinator.len(), 6);
}

#[test]
fn test_restart_can_clear_queue() {
    let temp = create_test_tree();
    let extra = temp.path().join("extra.md");
    fs::write(&extra, "# extra").unwrap();

    let config = ScanConfig::builder()
        .targets(vec![temp.path().join("S"), extra.clone()])
        .clear_on_restart(true)
        .build()
        .unwrap();
    let coordinator = ScanCoordinator::new();
    coordinator.configure(&config).unwrap();
    assert_eq!(coordinator.snapshot(), vec![extra.clone()]);

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert_eq!(coordinator.len(), 2);

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));
    let found: BTreeSet<_> = coordinator.snapshot().into_iter().collect();
    let expected: BTreeSet<_> = [extra, temp.path().join("S/c.java")].into();
    assert_eq!(found, expected);
}

#[test]
fn test_concurrent_consumers_see_each_file_once() {
    let coordinator = Arc::new(ScanCoordinator::with_filesystem(slow_tree(12)));
    coordinator.add_directory("/slow").unwrap();
    coordinator.start().unwrap();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let interrupter = coordinator.interrupter();
            thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(path) = coordinator.next_found(&interrupter).unwrap() {
                    taken.push(path);
                }
                taken
            })
        })
        .collect();

    let all: Vec<PathBuf> = consumers
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    let unique: BTreeSet<_> = all.iter().cloned().collect();

    assert_eq!(all.len(), 12);
    assert_eq!(unique.len(), 12);
    assert!(coordinator.is_finished());
}

#[test]
fn test_progress_reports_completion() {
    let temp = create_test_tree();
    let coordinator = ScanCoordinator::new();
    coordinator.add_directory(temp.path()).unwrap();
    let mut progress_rx = coordinator.subscribe();

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));

    let last = std::iter::from_fn(|| progress_rx.try_recv().ok())
        .last()
        .unwrap();
    assert!(last.done);
    assert_eq!(last.files_found, 3);
    assert_eq!(last.dirs_scanned, 2);
}

#[test]
fn test_stop_finishes_early() {
    let coordinator = ScanCoordinator::with_filesystem(
        slow_tree(50).with_latency(Duration::from_millis(50)),
    );
    coordinator.add_directory("/slow").unwrap();
    coordinator.start().unwrap();

    assert!(coordinator.stop());
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert!(coordinator.len() < 50);
}

#[test]
fn test_panicking_filter_still_finishes() {
    let coordinator = ScanCoordinator::with_filesystem(slow_tree(2));
    coordinator.add_directory("/slow").unwrap();
    coordinator
        .add_filter(Predicate::custom(|_: &Path, _: &str| -> bool {
            panic!("filter blew up")
        }))
        .unwrap();

    coordinator.start().unwrap();
    assert!(coordinator.wait_finished_timeout(BUDGET));
    assert!(coordinator.is_finished());
    assert!(!coordinator.join());
}
