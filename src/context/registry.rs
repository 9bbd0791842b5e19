//! Context registry: maps context identifiers to engine handles.

use crate::engine::{EngineHandle, InitArgs, RecoveryEngine};
use crate::error::ServiceError;
use crate::types::new_context_id;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Thread-safe store of engine handles keyed by context ID.
///
/// The lock guards the map only. Engine calls happen on a cloned `Arc` after
/// the lock is released, so a slow engine never blocks other lookups.
pub struct ContextRegistry {
    engine: Arc<dyn RecoveryEngine>,
    contexts: RwLock<HashMap<String, Arc<dyn EngineHandle>>>,
}

impl ContextRegistry {
    pub fn new(engine: Arc<dyn RecoveryEngine>) -> Self {
        Self {
            engine,
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the engine backing every context.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Initialize a new engine instance and register it.
    ///
    /// Nothing is registered when initialization fails.
    pub fn create(&self, args: &InitArgs) -> Result<String, ServiceError> {
        let handle = self.engine.init(args).map_err(|e| {
            warn!(error = %e, "Engine initialization failed");
            e
        })?;
        let context_id = new_context_id();
        self.contexts.write().insert(context_id.clone(), handle);
        info!(context_id = %context_id, "Context created");
        Ok(context_id)
    }

    /// Look up the handle for `context_id`.
    pub fn get(&self, context_id: &str) -> Result<Arc<dyn EngineHandle>, ServiceError> {
        self.contexts
            .read()
            .get(context_id)
            .cloned()
            .ok_or_else(|| ServiceError::ContextNotFound(context_id.to_string()))
    }

    pub fn contains(&self, context_id: &str) -> bool {
        self.contexts.read().contains_key(context_id)
    }

    /// Remove a context and finish its handle. Returns whether anything was
    /// removed; unknown IDs are a no-op.
    pub fn remove(&self, context_id: &str) -> bool {
        let removed = self.contexts.write().remove(context_id);
        match removed {
            Some(handle) => {
                handle.finish();
                info!(context_id = %context_id, "Context cleaned up and removed");
                true
            }
            None => {
                debug!(context_id = %context_id, "Remove of unknown context ignored");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }

    /// Finish and drop every remaining handle.
    pub fn close(&self) {
        let drained: Vec<(String, Arc<dyn EngineHandle>)> =
            self.contexts.write().drain().collect();
        for (context_id, handle) in drained {
            handle.finish();
            debug!(context_id = %context_id, "Context finished during close");
        }
    }
}

impl Drop for ContextRegistry {
    fn drop(&mut self) {
        self.close();
    }
}
