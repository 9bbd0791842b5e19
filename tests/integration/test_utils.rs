//! Shared fixtures: a service over simulated disks and polling helpers.

use recoverd::engine::{SimulatedConfig, SimulatedDevice, SimulatedEngine, SimulatedPartition};
use recoverd::logging::LogHandle;
use recoverd::recovery::{RecoveryOptions, StatusSnapshot};
use recoverd::service::{RecoveryService, StartRecovery};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Small disk that finishes in a handful of steps.
pub const SMALL_DISK: &str = "/dev/sim-small";
/// Disk large enough that a run only ends when stopped.
pub const HUGE_DISK: &str = "/dev/sim-huge";

pub fn device(path: &str, size: u64, partitions: Vec<SimulatedPartition>) -> SimulatedDevice {
    SimulatedDevice {
        path: path.to_string(),
        size,
        model: "SIMULATED".to_string(),
        serial_no: format!("SN-{}", path.trim_start_matches("/dev/")),
        firmware_rev: "1.0".to_string(),
        partitions,
    }
}

pub fn engine_config() -> SimulatedConfig {
    SimulatedConfig {
        devices: vec![
            device(
                SMALL_DISK,
                64 * 1024,
                vec![SimulatedPartition {
                    name: "boot".to_string(),
                    filesystem: "vfat".to_string(),
                    offset: 0,
                    size: 16 * 1024,
                }],
            ),
            device(HUGE_DISK, 1 << 50, Vec::new()),
        ],
        step_bytes: 4096,
        step_delay_ms: 2,
        bytes_per_file: 1024,
        files_per_directory: 16,
    }
}

pub fn service() -> Arc<RecoveryService> {
    Arc::new(RecoveryService::new(
        Arc::new(SimulatedEngine::new(engine_config())),
        Duration::from_millis(10),
        LogHandle::detached("info"),
    ))
}

pub fn start(
    service: &RecoveryService,
    context_id: &str,
    device: &str,
    partition_order: i32,
    output: &Path,
) -> String {
    service
        .start_recovery(StartRecovery {
            context_id: context_id.to_string(),
            device: device.to_string(),
            partition_order,
            output_dir: Some(output.to_path_buf()),
            options: RecoveryOptions::default(),
        })
        .expect("start recovery")
}

/// Poll until complete or panic after `timeout`.
pub fn wait_complete(service: &RecoveryService, recovery_id: &str, timeout: Duration) -> StatusSnapshot {
    let deadline = Instant::now() + timeout;
    loop {
        let snap = service.recovery_status(recovery_id).expect("status");
        if snap.is_complete {
            return snap;
        }
        assert!(Instant::now() < deadline, "recovery {} did not complete", recovery_id);
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Poll until the recovery has made some progress.
pub fn wait_progress(service: &RecoveryService, recovery_id: &str) -> StatusSnapshot {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let snap = service.recovery_status(recovery_id).expect("status");
        if snap.current_offset > 0 {
            return snap;
        }
        assert!(Instant::now() < deadline, "recovery {} made no progress", recovery_id);
        std::thread::sleep(Duration::from_millis(2));
    }
}
