//! Shutdown coordination
//!
//! Decides whether the service may stop, resolves active sessions when forced,
//! then stops the listener after a short grace delay so the acknowledgement
//! can reach the caller. The listener waits on a `watch` channel flipped here.

use crate::error::ServiceError;
use crate::recovery::SessionRegistry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Invoked once, after sessions are resolved and before the listener stops.
pub type ShutdownCallback = Box<dyn FnOnce() + Send + 'static>;

/// Accepted shutdown request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub message: String,
    /// Sessions that were stopped because the request was forced
    pub stopped_sessions: usize,
}

struct CoordinatorState {
    accepting: bool,
    callback: Option<ShutdownCallback>,
}

pub struct ShutdownCoordinator {
    sessions: Arc<SessionRegistry>,
    grace: Duration,
    state: Mutex<CoordinatorState>,
    signal: Arc<watch::Sender<bool>>,
}

impl ShutdownCoordinator {
    pub fn new(sessions: Arc<SessionRegistry>, grace: Duration) -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            sessions,
            grace,
            state: Mutex::new(CoordinatorState {
                accepting: true,
                callback: None,
            }),
            signal: Arc::new(signal),
        }
    }

    /// Install the host callback. Replaces any previous one.
    pub fn set_callback(&self, callback: ShutdownCallback) {
        self.state.lock().callback = Some(callback);
    }

    /// Receiver that turns `true` when the listener should stop.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        !self.state.lock().accepting
    }

    /// Run `admit` only while shutdown has not been accepted.
    ///
    /// Holds the coordinator lock for the duration, so a session registered
    /// here is always seen by a concurrent shutdown's active count.
    pub fn admit<T>(
        &self,
        admit: impl FnOnce() -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let state = self.state.lock();
        if !state.accepting {
            return Err(ServiceError::ShuttingDown);
        }
        let result = admit();
        drop(state);
        result
    }

    /// Handle a shutdown request.
    ///
    /// Without `force`, any active session denies the request with no side
    /// effects. With `force`, every active session is stopped and joined
    /// before the listener is told to stop.
    pub fn request_shutdown(
        &self,
        force: bool,
        reason: Option<&str>,
    ) -> Result<ShutdownReport, ServiceError> {
        let mut state = self.state.lock();
        let reason = reason.filter(|r| !r.is_empty()).unwrap_or("not specified");
        info!(force, reason = %reason, "Shutdown requested");

        if !state.accepting {
            return Ok(ShutdownReport {
                message: "Server shutdown already initiated".to_string(),
                stopped_sessions: 0,
            });
        }

        let active = self.sessions.active();
        if !active.is_empty() && !force {
            warn!(active = active.len(), "Shutdown denied: active recovery sessions");
            return Err(ServiceError::ShutdownDenied {
                active: active.len(),
            });
        }

        for session in &active {
            info!(recovery_id = %session.id(), "Stopping recovery session for shutdown");
            if let Err(e) = session.stop() {
                error!(recovery_id = %session.id(), error = %e, "Failed to stop session");
            }
        }

        state.accepting = false;
        let callback = state.callback.take();
        drop(state);

        self.schedule_stop(callback);

        let message = if active.is_empty() {
            "Server shutdown initiated".to_string()
        } else {
            format!(
                "Server shutdown initiated (forced with {} active sessions stopped)",
                active.len()
            )
        };
        info!(stopped = active.len(), "{}", message);
        Ok(ShutdownReport {
            message,
            stopped_sessions: active.len(),
        })
    }

    /// Stop every active session without touching the listener.
    pub fn stop_all(&self) -> usize {
        let active = self.sessions.active();
        for session in &active {
            if let Err(e) = session.stop() {
                error!(recovery_id = %session.id(), error = %e, "Failed to stop session");
            }
        }
        active.len()
    }

    fn schedule_stop(&self, callback: Option<ShutdownCallback>) {
        let grace = self.grace;
        let signal = Arc::clone(&self.signal);
        let spawned = std::thread::Builder::new()
            .name("shutdown".to_string())
            .spawn(move || {
                std::thread::sleep(grace);
                if let Some(callback) = callback {
                    info!("Calling shutdown callback");
                    callback();
                }
                signal.send_replace(true);
                info!("Listener stop signalled");
            });
        if let Err(e) = spawned {
            error!(error = %e, "Failed to spawn shutdown thread; stopping immediately");
            self.signal.send_replace(true);
        }
    }
}
