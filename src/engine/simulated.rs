//! In-process engine that walks a target without touching real devices.
//!
//! Used when no native engine is linked and throughout the test suite. Disks
//! come from configuration or from registered image files; a run advances in
//! fixed steps, reports progress, and stops between steps when aborted.

use crate::engine::{
    ArchInfo, DiskInfo, EngineHandle, EngineOptions, EngineProgress, FileTypeOption,
    FileTypeStatistics, InitArgs, PartitionInfo, PartitionStatus, ProgressSink, RecoveryEngine,
    RecoveryPhase, StatusStep, REPAIR_INVALID, REPAIR_NOT_FOUND, REPAIR_NO_DISK, REPAIR_OK,
    RUN_ACCESS_DENIED, RUN_OK, RUN_STOPPED,
};
use crate::error::ServiceError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Every this many carved candidates one is corrupt.
const CORRUPT_EVERY: u64 = 16;

const ARCHITECTURES: &[(&str, &str, &str)] = &[
    ("intel", "Intel/PC partition", "P"),
    ("efi_gpt", "EFI GPT partition map", "P"),
    ("humax", "Humax partition table", "P"),
    ("mac", "Apple partition map", "P"),
    ("none", "No partition table", "P"),
    ("sun", "Sun Solaris partition", "P"),
    ("xbox", "XBox partition", "P"),
];

/// Partition type ids the simulated engine can name.
const PARTITION_TYPES: &[(u32, &str)] = &[
    (0x07, "NTFS"),
    (0x0b, "FAT32"),
    (0x0c, "FAT32 LBA"),
    (0x82, "Linux Swap"),
    (0x83, "Linux"),
    (0x8e, "Linux LVM"),
    (0xee, "EFI GPT"),
];

/// Order in which a partition's status cycles.
const STATUS_CYCLE: &[PartitionStatus] = &[
    PartitionStatus::Primary,
    PartitionStatus::PrimaryBoot,
    PartitionStatus::Logical,
    PartitionStatus::Deleted,
];

const FILE_TYPES: &[(&str, &str, u64, bool)] = &[
    ("jpg", "JPG picture", 50 * 1024 * 1024, true),
    ("png", "Portable/JPEG/Multiple-Image Network Graphics", 50 * 1024 * 1024, true),
    ("pdf", "Portable Document Format, Adobe Illustrator", 200 * 1024 * 1024, true),
    ("zip", "zip archive including OpenOffice and MSOffice 2007", 4096 * 1024 * 1024, true),
    ("doc", "Microsoft Office Document (doc/xls/ppt/vsd/...)", 200 * 1024 * 1024, true),
    ("mp3", "MP3 audio (MPEG ADTS, layer III, v1)", 200 * 1024 * 1024, true),
    ("mov", "mov/mp4/3gp/3g2/jp2", 4096 * 1024 * 1024, true),
    ("txt", "Other text files", 10 * 1024 * 1024, false),
];

/// Simulated engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedConfig {
    /// Devices visible to every new handle
    #[serde(default)]
    pub devices: Vec<SimulatedDevice>,

    /// Bytes covered per step
    #[serde(default = "default_step_bytes")]
    pub step_bytes: u64,

    /// Delay per step (milliseconds)
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,

    /// One carved file per this many bytes scanned
    #[serde(default = "default_bytes_per_file")]
    pub bytes_per_file: u64,

    /// Files per output directory before a new one is created
    #[serde(default = "default_files_per_directory")]
    pub files_per_directory: u32,
}

fn default_step_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_step_delay_ms() -> u64 {
    10
}

fn default_bytes_per_file() -> u64 {
    8 * 1024 * 1024
}

fn default_files_per_directory() -> u32 {
    500
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            step_bytes: default_step_bytes(),
            step_delay_ms: default_step_delay_ms(),
            bytes_per_file: default_bytes_per_file(),
            files_per_directory: default_files_per_directory(),
        }
    }
}

impl SimulatedConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.step_bytes == 0 {
            return Err("step_bytes must be greater than zero".to_string());
        }
        if self.bytes_per_file == 0 {
            return Err("bytes_per_file must be greater than zero".to_string());
        }
        if self.files_per_directory == 0 {
            return Err("files_per_directory must be greater than zero".to_string());
        }
        for device in &self.devices {
            if device.path.trim().is_empty() {
                return Err("device path cannot be empty".to_string());
            }
            for part in &device.partitions {
                if part.offset.saturating_add(part.size) > device.size {
                    return Err(format!(
                        "partition '{}' extends past the end of {}",
                        part.name, device.path
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A configured device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedDevice {
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial_no: String,
    #[serde(default)]
    pub firmware_rev: String,
    #[serde(default)]
    pub partitions: Vec<SimulatedPartition>,
}

impl SimulatedDevice {
    fn to_disk_info(&self, arch: &str) -> DiskInfo {
        DiskInfo {
            device: self.path.clone(),
            description: format!(
                "Disk {} - {:.1} GiB",
                self.path,
                self.size as f64 / (1024.0 * 1024.0 * 1024.0)
            ),
            size: self.size,
            model: self.model.clone(),
            serial_no: self.serial_no.clone(),
            firmware_rev: self.firmware_rev.clone(),
            arch: arch.to_string(),
            autodetected_arch: "intel".to_string(),
        }
    }

    fn whole_disk(&self) -> PartitionInfo {
        PartitionInfo {
            name: "Whole disk".to_string(),
            filesystem: String::new(),
            offset: 0,
            size: self.size,
            info: String::new(),
            order: 0,
            status: PartitionStatus::Unknown,
        }
    }

    /// Partitions a search finds: every configured one, the first bootable.
    fn discoverable(&self) -> Vec<PartitionInfo> {
        self.partitions
            .iter()
            .enumerate()
            .map(|(idx, part)| PartitionInfo {
                name: part.name.clone(),
                filesystem: part.filesystem.clone(),
                offset: part.offset,
                size: part.size,
                info: format!("{} {}", part.filesystem, part.name).trim().to_string(),
                order: idx as i32 + 1,
                status: if idx == 0 {
                    PartitionStatus::PrimaryBoot
                } else {
                    PartitionStatus::Primary
                },
            })
            .collect()
    }
}

/// Partition state of one disk as seen by one handle.
#[derive(Debug, Clone)]
struct DiskLayout {
    /// Entries on disk, without the whole-disk entry
    table: Vec<PartitionInfo>,
    /// Working structure edited before a write
    structure: Vec<PartitionInfo>,
    backup: Option<Vec<PartitionInfo>>,
    boot_code: bool,
}

impl DiskLayout {
    fn new(disk: &SimulatedDevice) -> Self {
        let table = disk.discoverable();
        Self {
            structure: table.clone(),
            table,
            backup: None,
            boot_code: false,
        }
    }

    /// The on-disk table as listed to callers.
    fn listing(&self, disk: &SimulatedDevice) -> Vec<PartitionInfo> {
        let mut listing = vec![disk.whole_disk()];
        listing.extend(self.table.iter().cloned());
        listing
    }

    fn structure_entry(&mut self, order: i32) -> Option<&mut PartitionInfo> {
        self.structure.iter_mut().find(|p| p.order == order)
    }
}

/// Why a partition structure cannot be written.
fn check_structure(disk_size: u64, entries: &[PartitionInfo]) -> Result<(), String> {
    let mut active: Vec<&PartitionInfo> = entries
        .iter()
        .filter(|p| p.status != PartitionStatus::Deleted)
        .collect();
    for part in &active {
        if part.size == 0 {
            return Err(format!("partition {} is empty", part.order));
        }
        if part.offset.saturating_add(part.size) > disk_size {
            return Err(format!("partition {} extends past the end of the disk", part.order));
        }
    }
    let bootable = active
        .iter()
        .filter(|p| p.status == PartitionStatus::PrimaryBoot)
        .count();
    if bootable > 1 {
        return Err(format!("{} bootable partitions", bootable));
    }
    active.sort_by_key(|p| p.offset);
    for pair in active.windows(2) {
        if pair[0].offset + pair[0].size > pair[1].offset {
            return Err(format!(
                "partitions {} and {} overlap",
                pair[0].order, pair[1].order
            ));
        }
    }
    Ok(())
}

fn cycle_status(status: PartitionStatus, step: StatusStep) -> PartitionStatus {
    // Statuses outside the cycle step in from the Deleted slot.
    let last = STATUS_CYCLE.len() - 1;
    let pos = STATUS_CYCLE.iter().position(|s| *s == status).unwrap_or(last);
    let next = match step {
        StatusStep::Next => (pos + 1) % STATUS_CYCLE.len(),
        StatusStep::Previous => (pos + last) % STATUS_CYCLE.len(),
    };
    STATUS_CYCLE[next]
}

fn type_label(part_type: u32) -> String {
    PARTITION_TYPES
        .iter()
        .find(|(id, _)| *id == part_type)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("Type 0x{:02x}", part_type))
}

/// A configured partition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedPartition {
    pub name: String,
    #[serde(default)]
    pub filesystem: String,
    pub offset: u64,
    pub size: u64,
}

/// Engine factory producing [`SimulatedHandle`]s.
pub struct SimulatedEngine {
    config: SimulatedConfig,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }
}

impl RecoveryEngine for SimulatedEngine {
    /// Positional arguments after the program name preselect a device; an
    /// unknown device fails initialization.
    fn init(&self, args: &InitArgs) -> Result<Arc<dyn EngineHandle>, ServiceError> {
        let argv = args.effective_args();
        let handle = SimulatedHandle::new(self.config.clone());
        for arg in argv.iter().skip(1).filter(|a| !a.starts_with('-')) {
            if handle.select_device(arg).is_none() {
                warn!(device = %arg, "Simulated engine init: unknown device");
                return Err(ServiceError::EngineInitFailed(format!("unknown device {}", arg)));
            }
        }
        debug!(argc = argv.len(), log_mode = args.log_mode, "Simulated engine handle created");
        Ok(Arc::new(handle))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[derive(Debug)]
struct HandleState {
    disks: Vec<SimulatedDevice>,
    selected_disk: Option<usize>,
    selected_partition: Option<PartitionInfo>,
    arch: String,
    options: EngineOptions,
    carve_free_space_only: bool,
    enabled: HashMap<String, bool>,
    output_dir: Option<PathBuf>,
    stats: HashMap<String, (u32, u32)>,
    /// Keyed by device path; created on first use
    layouts: HashMap<String, DiskLayout>,
}

/// One simulated engine instance.
pub struct SimulatedHandle {
    step_bytes: u64,
    step_delay: Duration,
    bytes_per_file: u64,
    files_per_directory: u32,
    state: Mutex<HandleState>,
    abort: AtomicBool,
    finished: AtomicBool,
}

struct RunPlan {
    total: u64,
    ext2: bool,
    keep_corrupted: bool,
    enabled: Vec<String>,
}

impl SimulatedHandle {
    pub fn new(config: SimulatedConfig) -> Self {
        let enabled = FILE_TYPES
            .iter()
            .map(|(ext, _, _, on)| (ext.to_string(), *on))
            .collect();
        Self {
            step_bytes: config.step_bytes.max(1),
            step_delay: Duration::from_millis(config.step_delay_ms),
            bytes_per_file: config.bytes_per_file.max(1),
            files_per_directory: config.files_per_directory.max(1),
            state: Mutex::new(HandleState {
                disks: config.devices,
                selected_disk: None,
                selected_partition: None,
                arch: "intel".to_string(),
                options: EngineOptions::default(),
                carve_free_space_only: false,
                enabled,
                output_dir: None,
                stats: HashMap::new(),
                layouts: HashMap::new(),
            }),
            abort: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    fn plan(&self) -> Option<RunPlan> {
        let state = self.state.lock();
        let disk = state.disks.get(state.selected_disk?)?;
        let total = state
            .selected_partition
            .as_ref()
            .map(|p| p.size)
            .unwrap_or(disk.size);
        let mut enabled: Vec<String> = state
            .enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(ext, _)| ext.clone())
            .collect();
        enabled.sort();
        Some(RunPlan {
            total,
            ext2: state.options.ext2_optimization,
            keep_corrupted: state.options.keep_corrupted,
            enabled,
        })
    }

    /// Run `op` against the selected disk's layout. `None` without a selection.
    fn with_layout<R>(&self, op: impl FnOnce(&SimulatedDevice, &mut DiskLayout) -> R) -> Option<R> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let disk = state.disks.get(state.selected_disk?)?;
        let layout = state
            .layouts
            .entry(disk.path.clone())
            .or_insert_with(|| DiskLayout::new(disk));
        Some(op(disk, layout))
    }

    /// Like `with_layout`, mapping a missing selection to [`REPAIR_NO_DISK`].
    fn repair(&self, action: &str, op: impl FnOnce(&SimulatedDevice, &mut DiskLayout) -> i32) -> i32 {
        match self.with_layout(op) {
            Some(code) => {
                debug!(action, code, "Partition repair finished");
                code
            }
            None => {
                warn!(action, "Partition repair without a selected disk");
                REPAIR_NO_DISK
            }
        }
    }

    fn record_files(&self, plan: &RunPlan, first: u64, last: u64) {
        if plan.enabled.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        for n in first..last {
            let ext = &plan.enabled[(n % plan.enabled.len() as u64) as usize];
            let entry = state.stats.entry(ext.clone()).or_insert((0, 0));
            if n % CORRUPT_EVERY == CORRUPT_EVERY - 1 && !plan.keep_corrupted {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }
    }
}

impl EngineHandle for SimulatedHandle {
    fn list_disks(&self) -> Vec<DiskInfo> {
        let state = self.state.lock();
        state.disks.iter().map(|d| d.to_disk_info(&state.arch)).collect()
    }

    fn add_image(&self, path: &Path) -> Option<DiskInfo> {
        let meta = std::fs::metadata(path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let device = path.to_string_lossy().to_string();
        let mut state = self.state.lock();
        if let Some(existing) = state.disks.iter().find(|d| d.path == device) {
            return Some(existing.to_disk_info(&state.arch));
        }
        let disk = SimulatedDevice {
            path: device,
            size: meta.len(),
            model: "Disk image".to_string(),
            serial_no: String::new(),
            firmware_rev: String::new(),
            partitions: Vec::new(),
        };
        let info = disk.to_disk_info(&state.arch);
        state.disks.push(disk);
        Some(info)
    }

    fn list_partitions(&self) -> Option<Vec<PartitionInfo>> {
        self.with_layout(|disk, layout| layout.listing(disk))
    }

    fn list_architectures(&self) -> Vec<ArchInfo> {
        ARCHITECTURES
            .iter()
            .map(|(name, description, kind)| ArchInfo {
                name: name.to_string(),
                description: description.to_string(),
                kind: kind.to_string(),
                is_available: true,
            })
            .collect()
    }

    fn select_architecture(&self, name: Option<&str>) -> Option<ArchInfo> {
        let wanted = name.unwrap_or("intel");
        let arch = self
            .list_architectures()
            .into_iter()
            .find(|a| a.name == wanted)?;
        self.state.lock().arch = arch.name.clone();
        Some(arch)
    }

    fn file_types(&self) -> Vec<FileTypeOption> {
        let state = self.state.lock();
        FILE_TYPES
            .iter()
            .map(|(ext, description, max, default_on)| FileTypeOption {
                extension: ext.to_string(),
                description: description.to_string(),
                max_filesize: *max,
                is_enabled: state.enabled.get(*ext).copied().unwrap_or(false),
                enabled_by_default: *default_on,
            })
            .collect()
    }

    fn select_device(&self, path: &str) -> Option<DiskInfo> {
        let known = {
            let state = self.state.lock();
            state.disks.iter().any(|d| d.path == path)
        };
        if !known {
            // Unknown paths are accepted when they are readable image files.
            self.add_image(Path::new(path))?;
        }
        let mut state = self.state.lock();
        let idx = state.disks.iter().position(|d| d.path == path)?;
        state.selected_disk = Some(idx);
        state.selected_partition = None;
        Some(state.disks[idx].to_disk_info(&state.arch))
    }

    fn select_partition(
        &self,
        order: i32,
        ext2_optimization: bool,
        carve_free_space_only: bool,
    ) -> Option<PartitionInfo> {
        let part = self
            .list_partitions()?
            .into_iter()
            .find(|p| p.order == order)?;
        let mut state = self.state.lock();
        state.selected_partition = Some(part.clone());
        state.options.ext2_optimization = ext2_optimization;
        state.carve_free_space_only = carve_free_space_only;
        Some(part)
    }

    fn set_options(&self, options: &EngineOptions) {
        let mut state = self.state.lock();
        state.options = EngineOptions {
            paranoid: options.paranoid.min(2),
            ..*options
        };
    }

    fn set_enabled_extensions(&self, enable: &[String], disable: &[String]) {
        let mut state = self.state.lock();
        for (list, on) in [(enable, true), (disable, false)] {
            for ext in list {
                if ext == "everything" {
                    state.enabled.values_mut().for_each(|v| *v = on);
                } else if let Some(flag) = state.enabled.get_mut(ext.as_str()) {
                    *flag = on;
                } else {
                    debug!(extension = %ext, "Ignoring unknown file extension");
                }
            }
        }
    }

    fn set_output_dir(&self, path: &Path) {
        self.state.lock().output_dir = Some(path.to_path_buf());
    }

    fn run(&self, progress: &dyn ProgressSink) -> i32 {
        // Aborts aimed at an earlier run must not stop this one. Cancellation
        // before this point is seen through the sink.
        self.abort.store(false, Ordering::SeqCst);
        if self.finished.load(Ordering::SeqCst) {
            warn!("Simulated run on a finished handle");
            return RUN_ACCESS_DENIED;
        }
        let Some(plan) = self.plan() else {
            warn!("Simulated run without a selected disk");
            return RUN_ACCESS_DENIED;
        };
        let output_dir = self.state.lock().output_dir.clone();
        if let Some(dir) = &output_dir {
            if let Err(e) = std::fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), error = %e, "Cannot create output directory");
                return RUN_ACCESS_DENIED;
            }
        }

        let phase = if plan.ext2 {
            RecoveryPhase::Ext2On
        } else {
            RecoveryPhase::Ext2Off
        };
        info!(total = plan.total, phase = phase.as_str(), "Simulated run started");

        let mut offset = 0u64;
        let mut carved = 0u64;
        let code = loop {
            if self.abort.load(Ordering::SeqCst) || progress.is_cancelled() {
                break RUN_STOPPED;
            }
            if offset >= plan.total {
                break RUN_OK;
            }
            std::thread::sleep(self.step_delay);
            offset = offset.saturating_add(self.step_bytes).min(plan.total);
            let now_carved = offset / self.bytes_per_file;
            self.record_files(&plan, carved, now_carved);
            carved = now_carved;
            let files = carved.min(u32::MAX as u64) as u32;
            progress.report(EngineProgress {
                phase,
                current_offset: offset,
                files_recovered: files,
                directories_created: directories_for(files, self.files_per_directory),
            });
        };

        if code == RUN_OK {
            let files = carved.min(u32::MAX as u64) as u32;
            progress.report(EngineProgress {
                phase: RecoveryPhase::Quit,
                current_offset: offset,
                files_recovered: files,
                directories_created: directories_for(files, self.files_per_directory),
            });
        }
        info!(code, offset, "Simulated run finished");
        code
    }

    fn abort(&self) {
        self.abort.store(true, Ordering::SeqCst);
    }

    fn statistics(&self) -> Vec<FileTypeStatistics> {
        let state = self.state.lock();
        let mut stats: Vec<FileTypeStatistics> = FILE_TYPES
            .iter()
            .filter_map(|(ext, description, _, _)| {
                state.stats.get(*ext).map(|(recovered, failed)| FileTypeStatistics {
                    file_type: ext.to_string(),
                    description: description.to_string(),
                    recovered: *recovered,
                    failed: *failed,
                })
            })
            .collect();
        stats.sort_by(|a, b| b.recovered.cmp(&a.recovered).then(a.file_type.cmp(&b.file_type)));
        stats
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.abort.store(true, Ordering::SeqCst);
        debug!("Simulated handle finished");
    }

    fn search_partitions(&self, fast: bool, dump: bool) -> i32 {
        self.repair("search", |disk, layout| {
            layout.structure = disk.discoverable();
            if dump {
                for part in &layout.structure {
                    debug!(order = part.order, offset = part.offset, size = part.size, name = %part.name, "Found partition");
                }
            }
            info!(fast, found = layout.structure.len(), device = %disk.path, "Partition search finished");
            REPAIR_OK
        })
    }

    fn validate_geometry(&self) -> i32 {
        self.repair("validate geometry", |disk, layout| {
            if disk.size == 0 {
                return REPAIR_INVALID;
            }
            match layout.table.iter().find(|p| p.offset.saturating_add(p.size) > disk.size) {
                Some(part) => {
                    warn!(order = part.order, "Partition does not fit the disk geometry");
                    REPAIR_INVALID
                }
                None => REPAIR_OK,
            }
        })
    }

    fn write_partition_table(&self, simulate: bool, no_confirm: bool) -> i32 {
        self.repair("write table", |disk, layout| {
            if let Err(reason) = check_structure(disk.size, &layout.structure) {
                warn!(%reason, "Refusing to write partition table");
                return REPAIR_INVALID;
            }
            if simulate {
                info!(device = %disk.path, "Simulated partition table write");
                return REPAIR_OK;
            }
            debug!(no_confirm, "Writing partition table");
            layout.table = layout
                .structure
                .iter()
                .filter(|p| p.status != PartitionStatus::Deleted)
                .cloned()
                .collect();
            info!(device = %disk.path, partitions = layout.table.len(), "Partition table written");
            REPAIR_OK
        })
    }

    fn delete_partition_table(&self) -> i32 {
        self.repair("delete table", |disk, layout| {
            warn!(device = %disk.path, "Deleting partition table");
            layout.table.clear();
            layout.structure.clear();
            REPAIR_OK
        })
    }

    fn test_partition_structure(&self) -> i32 {
        self.repair("test structure", |disk, layout| {
            match check_structure(disk.size, &layout.structure) {
                Ok(()) => REPAIR_OK,
                Err(reason) => {
                    info!(%reason, "Partition structure is invalid");
                    REPAIR_INVALID
                }
            }
        })
    }

    fn change_partition_status(&self, order: i32, step: StatusStep) -> i32 {
        self.repair("change status", |_, layout| match layout.structure_entry(order) {
            Some(part) => {
                part.status = cycle_status(part.status, step);
                debug!(order, status = part.status.as_str(), "Partition status changed");
                REPAIR_OK
            }
            None => REPAIR_NOT_FOUND,
        })
    }

    fn change_partition_type(&self, order: i32, part_type: u32) -> i32 {
        if part_type > 0xff {
            return REPAIR_INVALID;
        }
        self.repair("change type", |_, layout| match layout.structure_entry(order) {
            Some(part) => {
                part.filesystem = type_label(part_type);
                part.info = format!("{} {}", part.filesystem, part.name).trim().to_string();
                REPAIR_OK
            }
            None => REPAIR_NOT_FOUND,
        })
    }

    fn list_partition_files(&self, order: i32) -> i32 {
        let bytes_per_file = self.bytes_per_file;
        self.repair("list files", |_, layout| {
            let Some(part) = layout.table.iter().find(|p| p.order == order) else {
                return REPAIR_NOT_FOUND;
            };
            if part.status == PartitionStatus::Deleted || part.filesystem.is_empty() {
                return REPAIR_INVALID;
            }
            info!(
                order,
                filesystem = %part.filesystem,
                entries = part.size / bytes_per_file,
                "Partition directory listed"
            );
            REPAIR_OK
        })
    }

    fn save_partition_backup(&self) -> i32 {
        self.repair("save backup", |_, layout| {
            layout.backup = Some(layout.structure.clone());
            REPAIR_OK
        })
    }

    fn load_partition_backup(&self) -> i32 {
        self.repair("load backup", |_, layout| match &layout.backup {
            Some(backup) => {
                layout.structure = backup.clone();
                REPAIR_OK
            }
            None => REPAIR_NOT_FOUND,
        })
    }

    fn write_mbr_code(&self) -> i32 {
        self.repair("write boot code", |disk, layout| {
            warn!(device = %disk.path, "Writing boot code");
            layout.boot_code = true;
            REPAIR_OK
        })
    }

    fn ensure_single_bootable(&self) -> i32 {
        self.repair("single bootable", |_, layout| {
            let mut seen = false;
            let mut ordered: Vec<&mut PartitionInfo> = layout.structure.iter_mut().collect();
            ordered.sort_by_key(|p| p.order);
            for part in ordered {
                if part.status == PartitionStatus::PrimaryBoot {
                    if seen {
                        part.status = PartitionStatus::Primary;
                    }
                    seen = true;
                }
            }
            REPAIR_OK
        })
    }
}

fn directories_for(files: u32, per_dir: u32) -> u32 {
    if files == 0 {
        0
    } else {
        (files - 1) / per_dir + 1
    }
}
