//! Configuration System
//!
//! Layered service configuration: built-in defaults, the global config file,
//! an explicit `--config` file, then `RECOVERD__SECTION__KEY` environment
//! variables. CLI flags are applied on top by the binary.

use crate::engine::SimulatedConfig;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Listener and shutdown settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Engine backend selection
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (host:port)
    #[serde(default = "default_address")]
    pub address: String,

    /// Delay between acknowledging a shutdown and stopping the listener
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_address() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_shutdown_grace_ms() -> u64 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.address
            .parse::<SocketAddr>()
            .map(|_| ())
            .map_err(|e| format!("Invalid listen address '{}': {}", self.address, e))
    }
}

/// Available engine backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Simulated,
}

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,

    /// Settings for the simulated backend
    #[serde(default)]
    pub simulated: SimulatedConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Server(String),
    Engine(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Server(msg) => write!(f, "Server: {}", msg),
            ValidationError::Engine(msg) => write!(f, "Engine: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ServiceConfig {
    /// Validate the entire configuration, collecting every error.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.server.validate() {
            errors.push(ValidationError::Server(e));
        }

        match self.engine.kind {
            EngineKind::Simulated => {
                if let Err(e) = self.engine.simulated.validate() {
                    errors.push(ValidationError::Engine(e));
                }
            }
        }

        if !matches!(self.logging.format.as_str(), "json" | "text") {
            errors.push(ValidationError::Logging(format!(
                "Invalid log format: {}",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
