//! Graceful and forced shutdown against running sessions.

use super::test_utils::*;
use recoverd::engine::InitArgs;
use recoverd::recovery::SessionState;
use recoverd::service::StartRecovery;
use recoverd::ServiceError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn unforced_shutdown_is_denied_while_sessions_run() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ids: Vec<String> = (0..2)
        .map(|i| {
            let ctx = service.create_context(&InitArgs::default()).unwrap();
            start(&service, &ctx, HUGE_DISK, -1, &out.path().join(i.to_string()))
        })
        .collect();
    let before: Vec<u64> = ids
        .iter()
        .map(|id| wait_progress(&service, id).current_offset)
        .collect();

    let err = service.shutdown(false, Some("maintenance")).unwrap_err();
    assert!(matches!(err, ServiceError::ShutdownDenied { active: 2 }));
    assert_eq!(
        err.to_string(),
        "Cannot shutdown: 2 active recovery sessions. Use force=true to shutdown anyway."
    );
    assert!(!service.is_shutting_down());

    std::thread::sleep(Duration::from_millis(30));
    for (id, offset) in ids.iter().zip(before) {
        let snap = service.recovery_status(id).unwrap();
        assert!(!snap.is_complete);
        assert!(snap.current_offset > offset);
    }

    for id in &ids {
        service.stop_recovery(id).unwrap();
    }
    let report = service.shutdown(false, None).unwrap();
    assert_eq!(report.message, "Server shutdown initiated");
}

#[test]
fn forced_shutdown_resolves_sessions_before_callback() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ids: Vec<String> = (0..3)
        .map(|i| {
            let ctx = service.create_context(&InitArgs::default()).unwrap();
            start(&service, &ctx, HUGE_DISK, -1, &out.path().join(i.to_string()))
        })
        .collect();
    for id in &ids {
        wait_progress(&service, id);
    }

    let observed: Arc<Mutex<Option<Vec<SessionState>>>> = Arc::new(Mutex::new(None));
    let weak = Arc::downgrade(&service);
    let sink = Arc::clone(&observed);
    let callback_ids = ids.clone();
    service.set_shutdown_callback(Box::new(move || {
        if let Some(service) = weak.upgrade() {
            let states = callback_ids
                .iter()
                .map(|id| service.recovery_status(id).unwrap().state)
                .collect();
            *sink.lock().unwrap() = Some(states);
        }
    }));
    let mut signal = service.shutdown_signal();

    let report = service.shutdown(true, Some("test")).unwrap();
    assert_eq!(report.stopped_sessions, 3);
    assert_eq!(
        report.message,
        "Server shutdown initiated (forced with 3 active sessions stopped)"
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    rt.block_on(async {
        tokio::time::timeout(Duration::from_secs(5), signal.wait_for(|stop| *stop))
            .await
            .unwrap()
            .unwrap();
    });

    let states = observed.lock().unwrap().clone().expect("callback fired");
    assert!(states.iter().all(|s| *s == SessionState::Aborted));
}

#[test]
fn recoveries_are_refused_once_shutdown_is_accepted() {
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let fired = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fired);
    service.set_shutdown_callback(Box::new(move || flag.store(true, Ordering::SeqCst)));

    service.shutdown(false, None).unwrap();
    let err = service
        .start_recovery(StartRecovery {
            context_id: ctx.clone(),
            device: SMALL_DISK.to_string(),
            partition_order: -1,
            output_dir: None,
            options: Default::default(),
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::ShuttingDown));

    // Read-only operations still answer until the listener stops.
    assert_eq!(service.heartbeat(Some(&ctx)).unwrap().active_contexts, 1);

    std::thread::sleep(Duration::from_millis(200));
    assert!(fired.load(Ordering::SeqCst));
}
