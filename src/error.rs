//! Error types for the recovery session service.

use thiserror::Error;

/// Service-level errors
///
/// Every variant is surfaced to callers as a `success = false` result carrying
/// the display text; none of them terminates the serving thread.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid context ID: {0}")]
    ContextNotFound(String),

    #[error("Invalid recovery ID: {0}")]
    RecoveryNotFound(String),

    #[error("No disk selected for context {0}; select a device first")]
    NoDiskSelected(String),

    #[error("Failed to initialize recovery engine: {0}")]
    EngineInitFailed(String),

    #[error("Failed to access {target}: {value}")]
    EngineSelectFailed { target: &'static str, value: String },

    #[error("Recovery process returned error code: {0}")]
    EngineRunFailed(i32),

    #[error("{message} (result code {code})")]
    RepairFailed { message: &'static str, code: i32 },

    #[error("Recovery worker error: {0}")]
    WorkerFault(String),

    #[error("Cannot shutdown: {active} active recovery sessions. Use force=true to shutdown anyway.")]
    ShutdownDenied { active: usize },

    #[error("Service is shutting down")]
    ShuttingDown,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Whether the error denotes an unknown identifier or a missing selection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::ContextNotFound(_)
                | ServiceError::RecoveryNotFound(_)
                | ServiceError::NoDiskSelected(_)
        )
    }

    pub(crate) fn device(path: &str) -> Self {
        ServiceError::EngineSelectFailed {
            target: "device",
            value: path.to_string(),
        }
    }

    pub(crate) fn partition(order: i32) -> Self {
        ServiceError::EngineSelectFailed {
            target: "partition",
            value: order.to_string(),
        }
    }

    pub(crate) fn architecture(name: &str) -> Self {
        ServiceError::EngineSelectFailed {
            target: "architecture",
            value: name.to_string(),
        }
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}
