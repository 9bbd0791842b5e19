//! Shared helpers: identifier generation and timestamps.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Prefix for context identifiers.
pub const CONTEXT_ID_PREFIX: &str = "ctx_";

/// Prefix for recovery session identifiers.
pub const RECOVERY_ID_PREFIX: &str = "rec_";

/// Number of hex characters after the prefix.
const ID_HEX_LEN: usize = 16;

/// Current time as milliseconds since Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a fresh context identifier (`ctx_` + 16 random hex chars).
pub fn new_context_id() -> String {
    random_id(CONTEXT_ID_PREFIX)
}

/// Generate a fresh recovery identifier (`rec_` + 16 random hex chars).
pub fn new_recovery_id() -> String {
    random_id(RECOVERY_ID_PREFIX)
}

fn random_id(prefix: &str) -> String {
    let value: u64 = rand::thread_rng().gen();
    format!("{prefix}{value:0width$x}", width = ID_HEX_LEN)
}
