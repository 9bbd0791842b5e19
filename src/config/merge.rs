//! Merge rules for layered configuration.

pub mod defaults;
