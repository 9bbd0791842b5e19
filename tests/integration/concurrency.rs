//! Concurrent access: identifier uniqueness, snapshot consistency and
//! independence of sessions.

use super::test_utils::*;
use recoverd::engine::InitArgs;
use recoverd::recovery::SessionState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn parallel_context_creation_yields_distinct_ids() {
    let service = service();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                (0..25)
                    .map(|_| service.create_context(&InitArgs::default()).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "duplicate context id");
        }
    }
    assert_eq!(ids.len(), 200);
    assert_eq!(service.heartbeat(None).unwrap().active_contexts, 200);
}

#[test]
fn parallel_recovery_starts_yield_distinct_ids() {
    let out = TempDir::new().unwrap();
    let service = service();
    // One context per recovery: a context's handle serves one job at a time.
    let contexts: Vec<String> = (0..20)
        .map(|_| service.create_context(&InitArgs::default()).unwrap())
        .collect();

    let handles: Vec<_> = contexts
        .chunks(5)
        .map(|chunk| {
            let service = Arc::clone(&service);
            let chunk = chunk.to_vec();
            let out = out.path().to_path_buf();
            thread::spawn(move || {
                chunk
                    .iter()
                    .map(|ctx| start(&service, ctx, SMALL_DISK, 1, &out.join(ctx)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "duplicate recovery id");
        }
    }
    assert_eq!(ids.len(), 20);
    for id in &ids {
        wait_complete(&service, id, Duration::from_secs(30));
    }
}

#[test]
fn status_reads_are_never_torn() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let id = id.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen_complete = false;
                let mut reads = 0u32;
                while !done.load(Ordering::SeqCst) || reads == 0 {
                    let snap = service.recovery_status(&id).unwrap();
                    // files are derived from the offset in the same report
                    assert_eq!(snap.files_recovered as u64, snap.current_offset / 1024);
                    if snap.is_complete {
                        assert!(!snap.status.is_empty());
                        assert!(snap.state.is_terminal());
                    }
                    assert!(!(seen_complete && !snap.is_complete), "completion regressed");
                    seen_complete |= snap.is_complete;
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    wait_progress(&service, &id);
    thread::sleep(Duration::from_millis(50));
    service.stop_recovery(&id).unwrap();
    thread::sleep(Duration::from_millis(10));
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(service.recovery_status(&id).unwrap().state, SessionState::Aborted);
}

#[test]
fn two_sessions_progress_independently() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx_a = service.create_context(&InitArgs::default()).unwrap();
    let ctx_b = service.create_context(&InitArgs::default()).unwrap();

    let (id_a, id_b) = thread::scope(|scope| {
        let a = scope.spawn(|| start(&service, &ctx_a, HUGE_DISK, -1, &out.path().join("a")));
        let b = scope.spawn(|| start(&service, &ctx_b, HUGE_DISK, -1, &out.path().join("b")));
        (a.join().unwrap(), b.join().unwrap())
    });
    assert_ne!(id_a, id_b);

    wait_progress(&service, &id_a);
    let b_before = wait_progress(&service, &id_b);

    service.stop_recovery(&id_a).unwrap();
    assert_eq!(service.recovery_status(&id_a).unwrap().state, SessionState::Aborted);

    // b keeps running after a is stopped
    thread::sleep(Duration::from_millis(50));
    let b_after = service.recovery_status(&id_b).unwrap();
    assert!(!b_after.is_complete);
    assert!(b_after.current_offset > b_before.current_offset);

    service.stop_recovery(&id_b).unwrap();
    assert_eq!(service.recovery_status(&id_b).unwrap().state, SessionState::Aborted);
}

#[test]
fn concurrent_stops_both_return_after_exit() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());
    wait_progress(&service, &id);

    thread::scope(|scope| {
        let stoppers: Vec<_> = (0..3)
            .map(|_| {
                scope.spawn(|| {
                    service.stop_recovery(&id).unwrap();
                    service.recovery_status(&id).unwrap()
                })
            })
            .collect();
        for stopper in stoppers {
            assert!(stopper.join().unwrap().is_complete);
        }
    });
}
