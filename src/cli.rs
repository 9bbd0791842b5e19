//! CLI domain: argument types and terminal presentation. The binaries own
//! the orchestration.

mod parse;
mod presentation;

pub use parse::{ClientCli, ClientCommands, ServerCli};
pub use presentation::{
    format_bytes, format_disks, format_failure, format_heartbeat, format_partitions,
    format_progress_line, format_recoveries, format_statistics, format_status,
};
