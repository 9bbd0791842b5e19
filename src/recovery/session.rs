//! Recovery session record and its status block.

use crate::engine::{EngineHandle, EngineProgress, ProgressSink, RecoveryPhase};
use crate::error::ServiceError;
use crate::types::now_millis;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

pub const STATUS_INITIALIZING: &str = "Initializing";
pub const STATUS_COMPLETED_OK: &str = "Completed successfully";
pub const STATUS_COMPLETED_ERROR: &str = "Completed with errors";
pub const STATUS_ABORTED: &str = "Aborted";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Running,
    CompletedOk,
    CompletedError,
    Aborted,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::CompletedOk => "completed_ok",
            SessionState::CompletedError => "completed_error",
            SessionState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::CompletedOk | SessionState::CompletedError | SessionState::Aborted
        )
    }

    /// Created or running; counted by shutdown and heartbeat.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// Point-in-time copy of a session's progress, taken under one lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub recovery_id: String,
    pub context_id: String,
    pub state: SessionState,
    pub status: String,
    pub current_offset: u64,
    pub total_size: u64,
    pub files_recovered: u32,
    pub directories_created: u32,
    pub is_complete: bool,
    pub error_message: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl StatusSnapshot {
    /// Fraction of the target scanned, in percent.
    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.current_offset as f64 / self.total_size as f64 * 100.0).min(100.0)
        }
    }
}

#[derive(Debug)]
struct StatusBlock {
    state: SessionState,
    status: String,
    current_offset: u64,
    total_size: u64,
    files_recovered: u32,
    directories_created: u32,
    error_message: Option<String>,
    updated_at: u64,
}

/// One asynchronous recovery job.
///
/// Status fields are written by the session's own worker; the cancel flag is
/// written by stop requests. Both are readable from any thread.
pub struct RecoverySession {
    id: String,
    context_id: String,
    handle: Arc<dyn EngineHandle>,
    created_at: u64,
    status: Mutex<StatusBlock>,
    cancel: AtomicBool,
    /// True while the worker is inside `EngineHandle::run`. Engine aborts are
    /// only sent under this lock while it is set.
    in_run: Mutex<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RecoverySession {
    pub fn new(id: String, context_id: String, handle: Arc<dyn EngineHandle>) -> Self {
        let created_at = now_millis();
        Self {
            id,
            context_id,
            handle,
            created_at,
            status: Mutex::new(StatusBlock {
                state: SessionState::Created,
                status: STATUS_INITIALIZING.to_string(),
                current_offset: 0,
                total_size: 0,
                files_recovered: 0,
                directories_created: 0,
                error_message: None,
                updated_at: created_at,
            }),
            cancel: AtomicBool::new(false),
            in_run: Mutex::new(false),
            worker: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn handle(&self) -> &Arc<dyn EngineHandle> {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        self.status.lock().state
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let block = self.status.lock();
        StatusSnapshot {
            recovery_id: self.id.clone(),
            context_id: self.context_id.clone(),
            state: block.state,
            status: block.status.clone(),
            current_offset: block.current_offset,
            total_size: block.total_size,
            files_recovered: block.files_recovered,
            directories_created: block.directories_created,
            is_complete: block.state.is_terminal(),
            error_message: block.error_message.clone(),
            created_at: self.created_at,
            updated_at: block.updated_at,
        }
    }

    /// Created -> Running. Returns false when the session already left Created.
    pub(crate) fn mark_running(&self) -> bool {
        let mut block = self.status.lock();
        if block.state != SessionState::Created {
            return false;
        }
        block.state = SessionState::Running;
        block.updated_at = now_millis();
        true
    }

    pub(crate) fn set_total_size(&self, total_size: u64) {
        let mut block = self.status.lock();
        if !block.state.is_terminal() {
            block.total_size = total_size;
            block.updated_at = now_millis();
        }
    }

    /// Write one progress report. Ignored once the session is terminal.
    pub(crate) fn publish(&self, progress: EngineProgress) {
        let mut block = self.status.lock();
        if block.state.is_terminal() {
            return;
        }
        block.status = progress.phase.as_str().to_string();
        block.current_offset = progress.current_offset;
        block.files_recovered = progress.files_recovered;
        block.directories_created = progress.directories_created;
        block.updated_at = now_millis();
    }

    /// Move to a terminal state. The first call wins; later calls return false
    /// and change nothing.
    pub(crate) fn complete(
        &self,
        state: SessionState,
        status: &str,
        error_message: Option<String>,
    ) -> bool {
        debug_assert!(state.is_terminal());
        let mut block = self.status.lock();
        if block.state.is_terminal() {
            return false;
        }
        block.state = state;
        block.status = status.to_string();
        block.error_message = error_message;
        block.updated_at = now_millis();
        true
    }

    /// Enter the engine run. Returns false, without entering, once the
    /// session has been cancelled.
    pub(crate) fn begin_run(&self) -> bool {
        let mut in_run = self.in_run.lock();
        if self.is_cancelled() {
            return false;
        }
        *in_run = true;
        true
    }

    pub(crate) fn end_run(&self) {
        *self.in_run.lock() = false;
    }

    /// Forward an abort to the engine only while a run is in progress; an
    /// abort sent outside a run would outlive this session on the shared handle.
    fn abort_run(&self) {
        let in_run = self.in_run.lock();
        if *in_run {
            self.handle.abort();
        }
    }

    pub(crate) fn attach_worker(&self, worker: JoinHandle<()>) {
        let mut slot = self.worker.lock();
        debug_assert!(slot.is_none(), "session already has a worker");
        *slot = Some(worker);
    }

    /// Stop the session and wait for its worker to exit.
    ///
    /// On a completed session this only reaps the worker thread. Otherwise the
    /// cancel flag is set, the engine is asked to abort if it is running, and
    /// the caller blocks until the worker returns. There is no timeout: an engine that ignores
    /// abort blocks the caller indefinitely.
    pub fn stop(&self) -> Result<(), ServiceError> {
        let already_complete = self.is_complete();
        if !already_complete {
            info!(recovery_id = %self.id, "Stopping recovery session");
            self.cancel.store(true, Ordering::SeqCst);
            self.abort_run();
        }

        // Holding the slot across the join makes a concurrent stopper wait for
        // the same exit.
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.take() {
            debug!(recovery_id = %self.id, "Waiting for recovery thread to finish");
            if worker.join().is_err() {
                warn!(recovery_id = %self.id, "Recovery thread panicked");
                self.complete(
                    SessionState::CompletedError,
                    STATUS_COMPLETED_ERROR,
                    Some(ServiceError::WorkerFault("worker thread panicked".into()).to_string()),
                );
            }
        }
        drop(slot);

        // No worker ever ran (or it exited without finalizing).
        if self.complete(SessionState::Aborted, STATUS_ABORTED, None) {
            debug!(recovery_id = %self.id, "Session finalized by stop");
        }
        if !already_complete {
            info!(recovery_id = %self.id, "Recovery stopped");
        }
        Ok(())
    }
}

impl ProgressSink for RecoverySession {
    fn report(&self, progress: EngineProgress) {
        self.publish(progress);
    }

    fn is_cancelled(&self) -> bool {
        RecoverySession::is_cancelled(self)
    }
}

/// Initial progress published right before the engine run.
pub(crate) fn initial_progress() -> EngineProgress {
    EngineProgress {
        phase: RecoveryPhase::FindOffset,
        current_offset: 0,
        files_recovered: 0,
        directories_created: 0,
    }
}
