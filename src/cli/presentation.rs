//! CLI presentation: tables and status lines for `recoverctl`.

use crate::context::StatisticsReport;
use crate::engine::{DiskInfo, PartitionInfo};
use crate::liveness::Heartbeat;
use crate::recovery::{SessionState, StatusSnapshot};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Human-readable byte count (binary units).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn format_disks(disks: &[DiskInfo]) -> String {
    if disks.is_empty() {
        return "No disks found".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Device", "Size", "Model", "Serial", "Arch"]);
    for disk in disks {
        table.add_row(vec![
            disk.device.clone(),
            format_bytes(disk.size),
            disk.model.clone(),
            disk.serial_no.clone(),
            disk.arch.clone(),
        ]);
    }
    table.to_string()
}

pub fn format_partitions(partitions: &[PartitionInfo]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Order", "Name", "Filesystem", "Offset", "Size", "Status"]);
    for part in partitions {
        table.add_row(vec![
            part.order.to_string(),
            part.name.clone(),
            part.filesystem.clone(),
            part.offset.to_string(),
            format_bytes(part.size),
            part.status.as_str().to_string(),
        ]);
    }
    table.to_string()
}

/// One-line progress for polling output.
pub fn format_progress_line(snapshot: &StatusSnapshot) -> String {
    format!(
        "[{:>5.1}%] {} - {} files, {} dirs",
        snapshot.percent(),
        snapshot.status,
        snapshot.files_recovered,
        snapshot.directories_created
    )
}

pub fn format_status(snapshot: &StatusSnapshot) -> String {
    let state = match snapshot.state {
        SessionState::CompletedOk => snapshot.state.as_str().green().to_string(),
        SessionState::CompletedError => snapshot.state.as_str().red().to_string(),
        SessionState::Aborted => snapshot.state.as_str().yellow().to_string(),
        SessionState::Created | SessionState::Running => snapshot.state.as_str().cyan().to_string(),
    };
    let mut out = format!(
        "{} {}\n  context:  {}\n  state:    {}\n  status:   {}\n  progress: {} / {} ({:.1}%)\n  files:    {} in {} directories",
        "Recovery".bold(),
        snapshot.recovery_id,
        snapshot.context_id,
        state,
        snapshot.status,
        format_bytes(snapshot.current_offset),
        format_bytes(snapshot.total_size),
        snapshot.percent(),
        snapshot.files_recovered,
        snapshot.directories_created,
    );
    if let Some(error) = &snapshot.error_message {
        out.push_str(&format!("\n  error:    {}", error.red()));
    }
    out
}

pub fn format_recoveries(snapshots: &[StatusSnapshot]) -> String {
    if snapshots.is_empty() {
        return "No recoveries".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Recovery", "Context", "State", "Progress", "Files"]);
    for snap in snapshots {
        table.add_row(vec![
            snap.recovery_id.clone(),
            snap.context_id.clone(),
            snap.state.as_str().to_string(),
            format!("{:.1}%", snap.percent()),
            snap.files_recovered.to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_statistics(report: &StatisticsReport) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Type", "Description", "Recovered", "Failed"]);
    for stat in &report.statistics {
        table.add_row(vec![
            stat.file_type.clone(),
            stat.description.clone(),
            stat.recovered.to_string(),
            stat.failed.to_string(),
        ]);
    }
    format!(
        "{}\nTotal: {} recovered, {} failed",
        table, report.total_files_recovered, report.total_files_failed
    )
}

pub fn format_heartbeat(heartbeat: &Heartbeat) -> String {
    format!(
        "{} recoverd {} up {}s, {} contexts, {} active recoveries",
        "alive".green(),
        heartbeat.server_version,
        heartbeat.uptime_seconds,
        heartbeat.active_contexts,
        heartbeat.active_recoveries
    )
}

pub fn format_failure(message: &str) -> String {
    format!("{} {}", "error:".red().bold(), message)
}
