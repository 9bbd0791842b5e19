//! Session registry: recovery ID to session.

use crate::error::ServiceError;
use crate::recovery::session::{RecoverySession, StatusSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Sessions are kept for the life of the process; there is no removal.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<RecoverySession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<RecoverySession>) {
        self.sessions
            .write()
            .insert(session.id().to_string(), session);
    }

    /// The returned `Arc` stays valid without holding the registry lock.
    pub fn get(&self, recovery_id: &str) -> Result<Arc<RecoverySession>, ServiceError> {
        self.sessions
            .read()
            .get(recovery_id)
            .cloned()
            .ok_or_else(|| ServiceError::RecoveryNotFound(recovery_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Sessions that have not reached a terminal state.
    pub fn active(&self) -> Vec<Arc<RecoverySession>> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.state().is_active())
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|s| s.state().is_active())
            .count()
    }

    /// Every session, including the ones that are still running.
    pub fn all(&self) -> Vec<Arc<RecoverySession>> {
        self.sessions.read().values().cloned().collect()
    }

    /// Snapshots of every session, oldest first.
    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        let mut snapshots: Vec<StatusSnapshot> =
            self.all().iter().map(|s| s.snapshot()).collect();
        snapshots.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.recovery_id.cmp(&b.recovery_id))
        });
        snapshots
    }
}
