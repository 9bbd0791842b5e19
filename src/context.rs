//! Contexts: configured engine instances and the operations that act on them.
//!
//! Every operation looks the handle up, releases the registry lock, then calls
//! the engine. Concurrent mutation of one context from two callers is not
//! serialized here; callers own a context one at a time.

pub mod registry;
pub mod repair;

pub use registry::ContextRegistry;
pub use repair::{RepairAction, RepairOutcome};

use crate::engine::{ArchInfo, DiskInfo, EngineOptions, FileTypeOption, FileTypeStatistics, PartitionInfo};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-type statistics with totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub statistics: Vec<FileTypeStatistics>,
    pub total_files_recovered: u32,
    pub total_files_failed: u32,
}

impl StatisticsReport {
    pub fn from_statistics(statistics: Vec<FileTypeStatistics>) -> Self {
        let total_files_recovered = statistics.iter().map(|s| s.recovered).sum();
        let total_files_failed = statistics.iter().map(|s| s.failed).sum();
        Self {
            statistics,
            total_files_recovered,
            total_files_failed,
        }
    }
}

impl ContextRegistry {
    pub fn disks(&self, context_id: &str) -> Result<Vec<DiskInfo>, ServiceError> {
        let disks = self.get(context_id)?.list_disks();
        debug!(context_id = %context_id, count = disks.len(), "Listed disks");
        Ok(disks)
    }

    pub fn add_image(&self, context_id: &str, image: &Path) -> Result<DiskInfo, ServiceError> {
        let handle = self.get(context_id)?;
        handle.add_image(image).ok_or_else(|| {
            warn!(context_id = %context_id, image = %image.display(), "Failed to add image");
            ServiceError::device(&image.to_string_lossy())
        })
    }

    pub fn select_device(&self, context_id: &str, device: &str) -> Result<DiskInfo, ServiceError> {
        let handle = self.get(context_id)?;
        let disk = handle
            .select_device(device)
            .ok_or_else(|| ServiceError::device(device))?;
        info!(context_id = %context_id, device = %device, size = disk.size, "Device selected");
        Ok(disk)
    }

    /// Partitions of the selected disk. When `device` is given it is selected
    /// first; without a device and without a prior selection this is
    /// `NoDiskSelected`, never an empty success.
    pub fn partitions(
        &self,
        context_id: &str,
        device: Option<&str>,
    ) -> Result<Vec<PartitionInfo>, ServiceError> {
        if let Some(device) = device.filter(|d| !d.is_empty()) {
            self.select_device(context_id, device)?;
        }
        self.get(context_id)?
            .list_partitions()
            .ok_or_else(|| ServiceError::NoDiskSelected(context_id.to_string()))
    }

    pub fn architectures(&self, context_id: &str) -> Result<Vec<ArchInfo>, ServiceError> {
        Ok(self.get(context_id)?.list_architectures())
    }

    /// Select a partition table type; an empty or missing name autodetects.
    pub fn select_architecture(
        &self,
        context_id: &str,
        name: Option<&str>,
    ) -> Result<ArchInfo, ServiceError> {
        let name = name.filter(|n| !n.is_empty());
        let handle = self.get(context_id)?;
        let arch = handle
            .select_architecture(name)
            .ok_or_else(|| ServiceError::architecture(name.unwrap_or("autodetect")))?;
        info!(context_id = %context_id, arch = %arch.name, "Architecture selected");
        Ok(arch)
    }

    pub fn file_types(&self, context_id: &str) -> Result<Vec<FileTypeOption>, ServiceError> {
        Ok(self.get(context_id)?.file_types())
    }

    /// Apply scalar options and extension toggles ahead of a recovery.
    pub fn configure(
        &self,
        context_id: &str,
        options: &EngineOptions,
        enable: &[String],
        disable: &[String],
    ) -> Result<(), ServiceError> {
        let handle = self.get(context_id)?;
        handle.set_options(options);
        if !enable.is_empty() || !disable.is_empty() {
            handle.set_enabled_extensions(enable, disable);
        }
        debug!(context_id = %context_id, paranoid = options.paranoid, "Options configured");
        Ok(())
    }

    pub fn statistics(&self, context_id: &str) -> Result<StatisticsReport, ServiceError> {
        let report = StatisticsReport::from_statistics(self.get(context_id)?.statistics());
        debug!(
            context_id = %context_id,
            recovered = report.total_files_recovered,
            failed = report.total_files_failed,
            "Statistics collected"
        );
        Ok(report)
    }
}
