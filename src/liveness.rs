//! Liveness reporting.

use crate::context::ContextRegistry;
use crate::error::ServiceError;
use crate::recovery::SessionRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Version reported by heartbeats.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub server_version: String,
    pub uptime_seconds: u64,
    pub active_contexts: usize,
    pub active_recoveries: usize,
}

/// Read-only view over both registries plus process uptime.
pub struct LivenessReporter {
    started: Instant,
    contexts: Arc<ContextRegistry>,
    sessions: Arc<SessionRegistry>,
}

impl LivenessReporter {
    pub fn new(contexts: Arc<ContextRegistry>, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            started: Instant::now(),
            contexts,
            sessions,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Heartbeat, optionally validating a context ID first. An unknown ID is
    /// an error; no partial heartbeat is returned.
    pub fn heartbeat(&self, context_id: Option<&str>) -> Result<Heartbeat, ServiceError> {
        if let Some(id) = context_id.filter(|id| !id.is_empty()) {
            if !self.contexts.contains(id) {
                return Err(ServiceError::ContextNotFound(id.to_string()));
            }
        }
        let heartbeat = Heartbeat {
            server_version: SERVER_VERSION.to_string(),
            uptime_seconds: self.uptime_seconds(),
            active_contexts: self.contexts.len(),
            active_recoveries: self.sessions.active_count(),
        };
        debug!(
            uptime = heartbeat.uptime_seconds,
            contexts = heartbeat.active_contexts,
            recoveries = heartbeat.active_recoveries,
            "Heartbeat"
        );
        Ok(heartbeat)
    }
}
