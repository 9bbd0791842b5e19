//! recoverd: concurrent recovery session service
//!
//! Wraps a blocking, stateful recovery engine in a multi-tenant service.
//! Contexts own configured engine handles; each started recovery runs on its
//! own worker thread and publishes progress that remote callers poll. Stop and
//! shutdown cancel cooperatively through the engine's abort primitive.

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod liveness;
pub mod logging;
pub mod recovery;
pub mod server;
pub mod service;
pub mod shutdown;
pub mod types;

pub use error::ServiceError;
pub use service::RecoveryService;
