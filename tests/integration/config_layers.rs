//! Layered configuration feeding a running service.

use recoverd::config::{ConfigLoader, ServiceConfig};
use recoverd::engine::InitArgs;
use recoverd::logging::LogHandle;
use recoverd::recovery::SessionState;
use recoverd::service::{RecoveryService, StartRecovery};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

// Environment variables are process-wide.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const FILE_CONFIG: &str = r#"
[server]
address = "127.0.0.1:7100"
shutdown_grace_ms = 20

[engine.simulated]
step_bytes = 8192
step_delay_ms = 0
bytes_per_file = 2048

[[engine.simulated.devices]]
path = "/dev/sim-config"
size = 65536
model = "CONFIGURED"
"#;

#[test]
fn environment_overrides_file_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recoverd.toml");
    std::fs::write(&path, FILE_CONFIG).unwrap();

    std::env::set_var("RECOVERD__SERVER__ADDRESS", "127.0.0.1:7200");
    std::env::set_var("RECOVERD__SERVER__SHUTDOWN_GRACE_MS", "42");
    let loaded = ConfigLoader::new()
        .with_global_file(None)
        .with_file(Some(path))
        .with_env(true)
        .load();
    std::env::remove_var("RECOVERD__SERVER__ADDRESS");
    std::env::remove_var("RECOVERD__SERVER__SHUTDOWN_GRACE_MS");

    let config = loaded.unwrap();
    assert_eq!(config.server.address, "127.0.0.1:7200");
    assert_eq!(config.server.shutdown_grace_ms, 42);
    assert_eq!(config.engine.simulated.bytes_per_file, 2048);
}

#[test]
fn file_configured_engine_drives_a_recovery() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recoverd.toml");
    std::fs::write(&path, FILE_CONFIG).unwrap();
    let config = ConfigLoader::load_from_file(&path).unwrap();
    config.validate().unwrap();

    let service = RecoveryService::from_config(&config, LogHandle::detached("info"));
    assert_eq!(service.engine_name(), "simulated");
    let ctx = service.create_context(&InitArgs::default()).unwrap();
    let disks = service.disks(&ctx).unwrap();
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].model, "CONFIGURED");

    let id = service
        .start_recovery(StartRecovery {
            context_id: ctx,
            device: "/dev/sim-config".to_string(),
            partition_order: -1,
            output_dir: Some(dir.path().join("out")),
            options: Default::default(),
        })
        .unwrap();
    let snap = super::test_utils::wait_complete(&service, &id, Duration::from_secs(10));
    assert_eq!(snap.state, SessionState::CompletedOk);
    assert_eq!(snap.files_recovered, 32);
    assert_eq!(snap.total_size, 65536);
}

#[test]
fn invalid_file_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(
        &path,
        "[server]\naddress = \"nowhere\"\n\n[logging]\nformat = \"yaml\"\n",
    )
    .unwrap();
    let config: ServiceConfig = ConfigLoader::load_from_file(&path).unwrap();
    let errors = config.validate().unwrap_err();
    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
    assert_eq!(rendered.len(), 2);
    assert!(rendered[0].starts_with("Server: Invalid listen address 'nowhere'"));
    assert_eq!(rendered[1], "Logging: Invalid log format: yaml");
}
