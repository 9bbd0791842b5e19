//! Recovery service facade
//!
//! Owns both registries, the shutdown coordinator and the liveness reporter,
//! and exposes every RPC operation as a plain method. Transport code calls
//! these and maps `ServiceError` to `success = false` responses.

use crate::config::{EngineKind, ServiceConfig};
use crate::context::{ContextRegistry, RepairAction, RepairOutcome, StatisticsReport};
use crate::engine::{
    ArchInfo, DiskInfo, FileTypeOption, InitArgs, PartitionInfo, RecoveryEngine, SimulatedEngine,
};
use crate::error::ServiceError;
use crate::liveness::{Heartbeat, LivenessReporter};
use crate::logging::LogHandle;
use crate::recovery::{
    worker, RecoveryOptions, RecoverySession, RecoveryTarget, SessionRegistry, StatusSnapshot,
};
use crate::shutdown::{ShutdownCallback, ShutdownCoordinator, ShutdownReport};
use crate::types::new_recovery_id;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Output directory used when a start request names none.
pub const DEFAULT_OUTPUT_DIR: &str = "recup_dir";

/// Parameters of a new recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRecovery {
    pub context_id: String,
    pub device: String,
    /// Partition order; negative (the default) recovers the whole disk
    #[serde(default = "whole_disk")]
    pub partition_order: i32,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub options: RecoveryOptions,
}

fn whole_disk() -> i32 {
    -1
}

pub struct RecoveryService {
    contexts: Arc<ContextRegistry>,
    sessions: Arc<SessionRegistry>,
    shutdown: ShutdownCoordinator,
    liveness: LivenessReporter,
    log: LogHandle,
    closed: AtomicBool,
}

impl RecoveryService {
    pub fn new(engine: Arc<dyn RecoveryEngine>, shutdown_grace: Duration, log: LogHandle) -> Self {
        let contexts = Arc::new(ContextRegistry::new(engine));
        let sessions = Arc::new(SessionRegistry::new());
        Self {
            shutdown: ShutdownCoordinator::new(Arc::clone(&sessions), shutdown_grace),
            liveness: LivenessReporter::new(Arc::clone(&contexts), Arc::clone(&sessions)),
            contexts,
            sessions,
            log,
            closed: AtomicBool::new(false),
        }
    }

    /// Build the service with the engine backend named in `config`.
    pub fn from_config(config: &ServiceConfig, log: LogHandle) -> Self {
        let engine: Arc<dyn RecoveryEngine> = match config.engine.kind {
            EngineKind::Simulated => {
                Arc::new(SimulatedEngine::new(config.engine.simulated.clone()))
            }
        };
        Self::new(engine, config.server.shutdown_grace(), log)
    }

    pub fn engine_name(&self) -> &str {
        self.contexts.engine_name()
    }

    // Contexts

    pub fn create_context(&self, args: &InitArgs) -> Result<String, ServiceError> {
        self.contexts.create(args)
    }

    pub fn disks(&self, context_id: &str) -> Result<Vec<DiskInfo>, ServiceError> {
        self.contexts.disks(context_id)
    }

    pub fn add_image(&self, context_id: &str, image: &Path) -> Result<DiskInfo, ServiceError> {
        self.contexts.add_image(context_id, image)
    }

    pub fn partitions(
        &self,
        context_id: &str,
        device: Option<&str>,
    ) -> Result<Vec<PartitionInfo>, ServiceError> {
        self.contexts.partitions(context_id, device)
    }

    pub fn architectures(&self, context_id: &str) -> Result<Vec<ArchInfo>, ServiceError> {
        self.contexts.architectures(context_id)
    }

    pub fn set_architecture(
        &self,
        context_id: &str,
        name: Option<&str>,
    ) -> Result<ArchInfo, ServiceError> {
        self.contexts.select_architecture(context_id, name)
    }

    pub fn file_options(&self, context_id: &str) -> Result<Vec<FileTypeOption>, ServiceError> {
        self.contexts.file_types(context_id)
    }

    pub fn configure_options(
        &self,
        context_id: &str,
        options: &RecoveryOptions,
    ) -> Result<(), ServiceError> {
        self.contexts.configure(
            context_id,
            &options.engine_options(),
            &options.enabled_file_types,
            &options.disabled_file_types,
        )
    }

    pub fn statistics(&self, context_id: &str) -> Result<StatisticsReport, ServiceError> {
        self.contexts.statistics(context_id)
    }

    /// Run one partition repair action on the context's selected disk.
    pub fn repair(
        &self,
        context_id: &str,
        action: RepairAction,
    ) -> Result<RepairOutcome, ServiceError> {
        self.contexts.repair(context_id, action)
    }

    /// Finish and drop a context. Unknown IDs report `ContextNotFound`.
    ///
    /// Sessions still running against the context keep their handle alive,
    /// but the engine refuses further work on it once finished.
    pub fn cleanup(&self, context_id: &str) -> Result<(), ServiceError> {
        if self.contexts.remove(context_id) {
            Ok(())
        } else {
            Err(ServiceError::ContextNotFound(context_id.to_string()))
        }
    }

    // Recoveries

    /// Allocate a session and start its worker. Returns the recovery ID.
    pub fn start_recovery(&self, request: StartRecovery) -> Result<String, ServiceError> {
        let handle = self.contexts.get(&request.context_id)?;
        let target = RecoveryTarget {
            device: request.device,
            partition_order: request.partition_order,
            output_dir: request
                .output_dir
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            options: request.options,
        };

        self.shutdown.admit(|| {
            let recovery_id = new_recovery_id();
            let session = Arc::new(RecoverySession::new(
                recovery_id.clone(),
                request.context_id.clone(),
                handle,
            ));
            info!(
                recovery_id = %recovery_id,
                context_id = %request.context_id,
                device = %target.device,
                partition = target.partition_order,
                "Starting recovery"
            );
            worker::spawn(Arc::clone(&session), target)?;
            self.sessions.insert(session);
            Ok(recovery_id)
        })
    }

    pub fn recovery_status(&self, recovery_id: &str) -> Result<StatusSnapshot, ServiceError> {
        Ok(self.sessions.get(recovery_id)?.snapshot())
    }

    /// Stop a recovery and wait for its worker. Succeeds without effect on a
    /// session that already completed.
    pub fn stop_recovery(&self, recovery_id: &str) -> Result<(), ServiceError> {
        self.sessions.get(recovery_id)?.stop()
    }

    /// Snapshots of every session retained since startup.
    pub fn list_recoveries(&self) -> Vec<StatusSnapshot> {
        self.sessions.snapshots()
    }

    // Process

    pub fn heartbeat(&self, context_id: Option<&str>) -> Result<Heartbeat, ServiceError> {
        self.liveness.heartbeat(context_id)
    }

    pub fn shutdown(&self, force: bool, reason: Option<&str>) -> Result<ShutdownReport, ServiceError> {
        self.shutdown.request_shutdown(force, reason)
    }

    pub fn set_shutdown_callback(&self, callback: ShutdownCallback) {
        self.shutdown.set_callback(callback);
    }

    /// Receiver that turns `true` once an accepted shutdown's grace delay ends.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_shutting_down()
    }

    pub fn set_log_level(&self, level: &str) -> Result<String, ServiceError> {
        let applied = self.log.set_level(level)?;
        info!(level = %applied, "Log level changed");
        Ok(applied)
    }

    pub fn log_level(&self) -> String {
        self.log.level()
    }

    /// Stop remaining sessions and finish every context. Runs once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let stopped = self.shutdown.stop_all();
        if stopped > 0 {
            warn!(stopped, "Stopped active recoveries during close");
        }
        self.contexts.close();
        info!("Recovery service closed");
    }
}

impl Drop for RecoveryService {
    fn drop(&mut self) {
        self.close();
    }
}
