//! End-to-end flows through the service facade.

use super::test_utils::*;
use recoverd::engine::{InitArgs, PartitionStatus};
use recoverd::recovery::RecoveryOptions;
use recoverd::recovery::SessionState;
use recoverd::ServiceError;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn partition_recovery_runs_to_completion() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();

    let disks = service.disks(&ctx).unwrap();
    assert_eq!(disks.len(), 2);

    // No disk selected yet: failure, not an empty list.
    let err = service.partitions(&ctx, None).unwrap_err();
    assert!(err.is_not_found());

    let parts = service.partitions(&ctx, Some(SMALL_DISK)).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1].status, PartitionStatus::PrimaryBoot);

    let id = start(&service, &ctx, SMALL_DISK, 1, out.path());
    let snap = wait_complete(&service, &id, Duration::from_secs(10));
    assert_eq!(snap.state, SessionState::CompletedOk);
    assert_eq!(snap.status, "Completed successfully");
    assert_eq!(snap.total_size, 16 * 1024);
    assert_eq!(snap.current_offset, 16 * 1024);
    assert_eq!(snap.files_recovered, 16);
    assert_eq!(snap.directories_created, 1);
    assert!(snap.error_message.is_none());

    let stats = service.statistics(&ctx).unwrap();
    assert_eq!(stats.total_files_recovered + stats.total_files_failed, 16);
    assert_eq!(stats.total_files_failed, 1);

    service.cleanup(&ctx).unwrap();
    assert!(service.disks(&ctx).unwrap_err().is_not_found());
    assert!(service.cleanup(&ctx).unwrap_err().is_not_found());

    // The session outlives its context.
    assert_eq!(service.recovery_status(&id).unwrap().state, SessionState::CompletedOk);
}

#[test]
fn stop_on_completed_session_is_a_no_op() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, SMALL_DISK, -1, out.path());
    let before = wait_complete(&service, &id, Duration::from_secs(10));

    service.stop_recovery(&id).unwrap();
    service.stop_recovery(&id).unwrap();

    let after = service.recovery_status(&id).unwrap();
    assert_eq!(after.state, before.state);
    assert_eq!(after.status, before.status);
    assert_eq!(after.files_recovered, before.files_recovered);
}

#[test]
fn stopping_a_running_recovery_aborts_it() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());
    wait_progress(&service, &id);

    service.stop_recovery(&id).unwrap();
    let snap = service.recovery_status(&id).unwrap();
    assert!(snap.is_complete);
    assert_eq!(snap.state, SessionState::Aborted);
    assert!(snap.current_offset < snap.total_size);

    // Second stop is idempotent.
    service.stop_recovery(&id).unwrap();
    assert_eq!(service.recovery_status(&id).unwrap().state, SessionState::Aborted);
}

#[test]
fn restart_after_an_early_stop_completes_cleanly() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    for round in 0..20 {
        // Stop lands before or around the engine run, never well inside it.
        let stopped = start(&service, &ctx, SMALL_DISK, -1, out.path());
        service.stop_recovery(&stopped).unwrap();
        assert!(service.recovery_status(&stopped).unwrap().is_complete);

        let next = start(&service, &ctx, SMALL_DISK, -1, out.path());
        let snap = wait_complete(&service, &next, Duration::from_secs(10));
        assert_eq!(snap.state, SessionState::CompletedOk, "round {}", round);
        assert!(snap.error_message.is_none(), "round {}", round);
        assert_eq!(snap.current_offset, 64 * 1024);
    }
}

#[test]
fn unreachable_device_completes_with_error() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, "/dev/does-not-exist", -1, out.path());
    let snap = wait_complete(&service, &id, Duration::from_secs(10));
    assert_eq!(snap.state, SessionState::CompletedError);
    assert_eq!(
        snap.error_message.as_deref(),
        Some("Failed to access device: /dev/does-not-exist")
    );
}

#[test]
fn cleanup_during_recovery_ends_the_run() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());
    wait_progress(&service, &id);

    service.cleanup(&ctx).unwrap();
    let snap = wait_complete(&service, &id, Duration::from_secs(10));
    assert_eq!(snap.state, SessionState::CompletedError);
    assert!(snap
        .error_message
        .unwrap()
        .starts_with("Recovery process returned error code:"));
}

#[test]
fn image_files_can_be_recovered() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("card.img");
    std::fs::write(&image, vec![0u8; 8192]).unwrap();

    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let disk = service.add_image(&ctx, &image).unwrap();
    assert_eq!(disk.size, 8192);
    assert_eq!(service.disks(&ctx).unwrap().len(), 3);

    let device = image.to_string_lossy().to_string();
    let id = start(&service, &ctx, &device, -1, &dir.path().join("out"));
    let snap = wait_complete(&service, &id, Duration::from_secs(10));
    assert_eq!(snap.state, SessionState::CompletedOk);
    assert_eq!(snap.files_recovered, 8);
    assert!(dir.path().join("out").is_dir());
}

#[test]
fn missing_image_is_a_select_failure() {
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let err = service
        .add_image(&ctx, std::path::Path::new("/nonexistent/disk.img"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::EngineSelectFailed { target: "device", .. }));
}

#[test]
fn configured_options_reach_the_engine() {
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let options = RecoveryOptions {
        disabled_file_types: vec!["everything".to_string()],
        enabled_file_types: vec![],
        ..Default::default()
    };
    service.configure_options(&ctx, &options).unwrap();
    assert!(service
        .file_options(&ctx)
        .unwrap()
        .iter()
        .all(|t| !t.is_enabled));
}

#[test]
fn recoveries_are_retained_and_listed() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let first = start(&service, &ctx, SMALL_DISK, -1, out.path());
    wait_complete(&service, &first, Duration::from_secs(10));
    let second = start(&service, &ctx, SMALL_DISK, 1, out.path());
    wait_complete(&service, &second, Duration::from_secs(10));

    let listed: Vec<String> = service
        .list_recoveries()
        .into_iter()
        .map(|s| s.recovery_id)
        .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first));
    assert!(listed.contains(&second));
}

#[test]
fn heartbeat_reports_counts() {
    let out = TempDir::new().unwrap();
    let service = service();
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());

    let hb = service.heartbeat(Some(&ctx)).unwrap();
    assert_eq!(hb.active_contexts, 1);
    assert_eq!(hb.active_recoveries, 1);

    service.stop_recovery(&id).unwrap();
    assert_eq!(service.heartbeat(None).unwrap().active_recoveries, 0);
    assert!(service.heartbeat(Some("ctx_ffffffffffffffff")).unwrap_err().is_not_found());
}
