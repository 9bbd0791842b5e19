//! Recovery sessions
//!
//! A session is one asynchronous recovery job against a context's engine
//! handle. Each session owns a worker thread that drives the blocking engine
//! run and writes a status block that pollers read concurrently.
//!
//! State machine: `Created -> Running -> {CompletedOk, CompletedError, Aborted}`.
//! Terminal states are final; progress reports arriving afterwards are
//! dropped.

pub mod options;
pub mod registry;
pub mod session;
pub mod worker;

pub use options::RecoveryOptions;
pub use registry::SessionRegistry;
pub use session::{RecoverySession, SessionState, StatusSnapshot};
pub use worker::RecoveryTarget;
