//! Configuration sources, in increasing priority.

pub mod environment;
pub mod explicit_file;
pub mod global_file;
