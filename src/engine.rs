//! Recovery engine boundary.
//!
//! The scan/carve algorithm lives behind these traits. A [`RecoveryEngine`]
//! produces [`EngineHandle`]s; each handle is one configured engine instance
//! and is owned by exactly one context. Every call is synchronous, and
//! [`EngineHandle::run`] blocks until the engine finishes or observes
//! [`EngineHandle::abort`].

pub mod simulated;

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use simulated::{SimulatedConfig, SimulatedDevice, SimulatedEngine, SimulatedPartition};

/// Program name passed to the engine when the caller supplies no arguments.
pub const DEFAULT_ENGINE_ARGV0: &str = "recovery-engine";

/// Run result: success.
pub const RUN_OK: i32 = 0;
/// Run result: stopped on request.
pub const RUN_STOPPED: i32 = 1;
/// Run result: target could not be read.
pub const RUN_ACCESS_DENIED: i32 = 2;
/// Run result: output directory is full.
pub const RUN_NO_SPACE: i32 = 3;

/// Partition repair result: success.
pub const REPAIR_OK: i32 = 0;
/// Partition repair result: no disk is selected.
pub const REPAIR_NO_DISK: i32 = 1;
/// Partition repair result: the partition or backup does not exist.
pub const REPAIR_NOT_FOUND: i32 = 2;
/// Partition repair result: the structure or argument is invalid.
pub const REPAIR_INVALID: i32 = 3;
/// Partition repair result: the engine has no partition repair support.
pub const REPAIR_UNSUPPORTED: i32 = -1;

/// Arguments for engine initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitArgs {
    /// Command-line style arguments; empty means "program name only"
    #[serde(default)]
    pub args: Vec<String>,
    /// Engine-side log mode
    #[serde(default)]
    pub log_mode: i32,
    /// Engine-side log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl InitArgs {
    /// Arguments with the default program name filled in.
    pub fn effective_args(&self) -> Vec<String> {
        if self.args.is_empty() {
            vec![DEFAULT_ENGINE_ARGV0.to_string()]
        } else {
            self.args.clone()
        }
    }
}

/// Scalar engine options applied before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Paranoia level (0-2)
    pub paranoid: u8,
    pub keep_corrupted: bool,
    pub ext2_optimization: bool,
    pub expert: bool,
    pub low_memory: bool,
    pub verbose: bool,
}

/// Disk known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub device: String,
    pub description: String,
    pub size: u64,
    pub model: String,
    pub serial_no: String,
    pub firmware_rev: String,
    pub arch: String,
    pub autodetected_arch: String,
}

/// Partition entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionStatus {
    Deleted,
    Primary,
    PrimaryBoot,
    Logical,
    Extended,
    ExtendedInExtended,
    Unknown,
}

impl PartitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionStatus::Deleted => "Deleted",
            PartitionStatus::Primary => "Primary",
            PartitionStatus::PrimaryBoot => "Primary Boot",
            PartitionStatus::Logical => "Logical",
            PartitionStatus::Extended => "Extended",
            PartitionStatus::ExtendedInExtended => "Extended in Extended",
            PartitionStatus::Unknown => "Unknown",
        }
    }
}

/// Direction for cycling a partition's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusStep {
    Next,
    Previous,
}

/// Partition on the currently selected disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub name: String,
    pub filesystem: String,
    pub offset: u64,
    pub size: u64,
    pub info: String,
    pub order: i32,
    pub status: PartitionStatus,
}

/// Partition table architecture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchInfo {
    pub name: String,
    pub description: String,
    pub kind: String,
    pub is_available: bool,
}

/// A recoverable file type and whether it is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeOption {
    pub extension: String,
    pub description: String,
    pub max_filesize: u64,
    pub is_enabled: bool,
    pub enabled_by_default: bool,
}

/// Per-type recovery counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeStatistics {
    pub file_type: String,
    pub description: String,
    pub recovered: u32,
    pub failed: u32,
}

/// Engine phase reported during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryPhase {
    FindOffset,
    Unformat,
    Ext2On,
    Ext2OnBruteForce,
    Ext2Off,
    Ext2OffBruteForce,
    Ext2OnSaveEverything,
    Ext2OffSaveEverything,
    Quit,
}

impl RecoveryPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryPhase::FindOffset => "Finding optimal block alignment",
            RecoveryPhase::Unformat => "FAT unformat recovery",
            RecoveryPhase::Ext2On => "Main recovery with filesystem optimization",
            RecoveryPhase::Ext2OnBruteForce => "Brute force with filesystem optimization",
            RecoveryPhase::Ext2Off => "Main recovery without filesystem optimization",
            RecoveryPhase::Ext2OffBruteForce => "Brute force without filesystem optimization",
            RecoveryPhase::Ext2OnSaveEverything => "Save everything mode with optimization",
            RecoveryPhase::Ext2OffSaveEverything => "Save everything mode without optimization",
            RecoveryPhase::Quit => "Recovery completed",
        }
    }
}

/// Progress reported by a running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineProgress {
    pub phase: RecoveryPhase,
    pub current_offset: u64,
    pub files_recovered: u32,
    pub directories_created: u32,
}

/// Receiver for progress published from inside [`EngineHandle::run`].
pub trait ProgressSink: Send + Sync {
    fn report(&self, progress: EngineProgress);

    /// Whether the owner of this run wants it stopped. Engines poll this
    /// alongside their own abort flag.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that drops every report.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _progress: EngineProgress) {}
}

/// Factory for engine handles.
pub trait RecoveryEngine: Send + Sync {
    /// Create a configured engine instance.
    fn init(&self, args: &InitArgs) -> Result<Arc<dyn EngineHandle>, ServiceError>;

    /// Engine name for logs and heartbeat output.
    fn name(&self) -> &str;
}

/// One engine instance.
///
/// Implementations are called from RPC threads and from the recovery worker.
/// `abort` is called concurrently with `run` and must be safe to do so.
///
/// The partition repair operations act on the selected disk and return a
/// `REPAIR_*` code. Engines without repair support keep the defaults.
pub trait EngineHandle: Send + Sync {
    fn list_disks(&self) -> Vec<DiskInfo>;

    /// Register a disk image file.
    fn add_image(&self, path: &Path) -> Option<DiskInfo>;

    /// Partitions of the selected disk, or `None` when no disk is selected.
    fn list_partitions(&self) -> Option<Vec<PartitionInfo>>;

    fn list_architectures(&self) -> Vec<ArchInfo>;

    /// Select a partition table architecture; `None` requests autodetection.
    fn select_architecture(&self, name: Option<&str>) -> Option<ArchInfo>;

    fn file_types(&self) -> Vec<FileTypeOption>;

    fn select_device(&self, path: &str) -> Option<DiskInfo>;

    fn select_partition(
        &self,
        order: i32,
        ext2_optimization: bool,
        carve_free_space_only: bool,
    ) -> Option<PartitionInfo>;

    fn set_options(&self, options: &EngineOptions);

    fn set_enabled_extensions(&self, enable: &[String], disable: &[String]);

    fn set_output_dir(&self, path: &Path);

    /// Blocking run. Returns [`RUN_OK`] on success, a non-zero code otherwise.
    /// Stops early with [`RUN_STOPPED`] on `abort` or when the sink reports
    /// cancellation.
    fn run(&self, progress: &dyn ProgressSink) -> i32;

    /// Ask an in-progress `run` to stop. An abort that arrives while no run
    /// is in progress is discarded when the next run begins.
    fn abort(&self);

    fn statistics(&self) -> Vec<FileTypeStatistics>;

    /// Release everything the handle owns. Called exactly once.
    fn finish(&self);

    /// Scan the disk for partitions and make them the working structure.
    fn search_partitions(&self, _fast: bool, _dump: bool) -> i32 {
        REPAIR_UNSUPPORTED
    }

    /// Check that the partition table fits the disk geometry.
    fn validate_geometry(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    /// Write the working structure as the new partition table. A simulated
    /// write checks the structure and changes nothing.
    fn write_partition_table(&self, _simulate: bool, _no_confirm: bool) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn delete_partition_table(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    /// Check the working structure for overlaps and boot flag conflicts.
    fn test_partition_structure(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn change_partition_status(&self, _order: i32, _step: StatusStep) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn change_partition_type(&self, _order: i32, _part_type: u32) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn list_partition_files(&self, _order: i32) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn save_partition_backup(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn load_partition_backup(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    fn write_mbr_code(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }

    /// Leave at most one bootable partition in the working structure.
    fn ensure_single_bootable(&self) -> i32 {
        REPAIR_UNSUPPORTED
    }
}
