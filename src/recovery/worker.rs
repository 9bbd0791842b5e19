//! Recovery worker: the body run on each session's dedicated thread.

use crate::engine::RUN_OK;
use crate::error::ServiceError;
use crate::recovery::options::RecoveryOptions;
use crate::recovery::session::{
    initial_progress, RecoverySession, SessionState, STATUS_ABORTED, STATUS_COMPLETED_ERROR,
    STATUS_COMPLETED_OK,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, info_span, warn};

/// What to recover and where.
#[derive(Debug, Clone)]
pub struct RecoveryTarget {
    pub device: String,
    /// Negative means the whole disk
    pub partition_order: i32,
    pub output_dir: PathBuf,
    pub options: RecoveryOptions,
}

/// Spawn the worker thread for `session` and attach it.
pub fn spawn(
    session: Arc<RecoverySession>,
    target: RecoveryTarget,
) -> Result<(), ServiceError> {
    let thread_session = Arc::clone(&session);
    let worker: JoinHandle<()> = std::thread::Builder::new()
        .name(format!("recovery-{}", session.id()))
        .spawn(move || run_worker(&thread_session, &target))?;
    session.attach_worker(worker);
    Ok(())
}

/// Drive one recovery to a terminal state. Never panics outward.
pub fn run_worker(session: &RecoverySession, target: &RecoveryTarget) {
    let span = info_span!("recovery", recovery_id = %session.id(), context_id = %session.context_id());
    let _guard = span.enter();
    info!(device = %target.device, "Recovery worker started");

    if !session.mark_running() {
        debug!("Session left Created before the worker started");
        return;
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| execute(session, target)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!(error = %e, "Recovery failed");
            session.complete(
                SessionState::CompletedError,
                STATUS_COMPLETED_ERROR,
                Some(e.to_string()),
            );
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(error = %message, "Recovery worker fault");
            session.complete(
                SessionState::CompletedError,
                STATUS_COMPLETED_ERROR,
                Some(ServiceError::WorkerFault(message).to_string()),
            );
        }
    }
}

fn execute(session: &RecoverySession, target: &RecoveryTarget) -> Result<(), ServiceError> {
    let handle = session.handle();
    let options = &target.options;

    debug!(paranoid = options.paranoid_mode, "Applying recovery options");
    handle.set_options(&options.engine_options());
    if options.has_file_type_filters() {
        handle.set_enabled_extensions(&options.enabled_file_types, &options.disabled_file_types);
    }

    let disk = handle
        .select_device(&target.device)
        .ok_or_else(|| ServiceError::device(&target.device))?;
    session.set_total_size(disk.size);
    info!(size = disk.size, "Disk selected");

    if target.partition_order >= 0 {
        let partition = handle
            .select_partition(
                target.partition_order,
                options.enable_ext2_optimization,
                options.carve_free_space_only,
            )
            .ok_or_else(|| ServiceError::partition(target.partition_order))?;
        session.set_total_size(partition.size);
        info!(order = target.partition_order, size = partition.size, "Partition selected");
    }

    debug!(output_dir = %target.output_dir.display(), "Setting output directory");
    handle.set_output_dir(&target.output_dir);

    session.publish(initial_progress());

    if !session.begin_run() {
        session.complete(SessionState::Aborted, STATUS_ABORTED, None);
        info!("Recovery cancelled before the engine started");
        return Ok(());
    }

    info!("Starting engine run");
    let code = handle.run(session);
    session.end_run();

    if code == RUN_OK {
        session.complete(SessionState::CompletedOk, STATUS_COMPLETED_OK, None);
        info!("Recovery completed successfully");
    } else if session.is_cancelled() {
        session.complete(SessionState::Aborted, STATUS_ABORTED, None);
        info!(code, "Recovery aborted");
    } else {
        warn!(code, "Recovery completed with errors");
        session.complete(
            SessionState::CompletedError,
            STATUS_COMPLETED_ERROR,
            Some(ServiceError::EngineRunFailed(code).to_string()),
        );
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
