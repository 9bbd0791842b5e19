//! Partition repair on a context's selected disk.
//!
//! Each action maps to one engine call returning a result code. Zero is
//! success; anything else becomes `RepairFailed` carrying the action's
//! failure text and the code.

use super::ContextRegistry;
use crate::engine::{EngineHandle, StatusStep, REPAIR_OK};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One partition repair operation and its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    SearchPartitions { fast_mode: bool, dump: bool },
    ValidateGeometry,
    /// `simulate` checks the structure without writing it.
    WriteTable { simulate: bool, no_confirm: bool },
    DeleteTable,
    TestStructure,
    ChangeStatus { order: i32, step: StatusStep },
    ChangeType { order: i32, part_type: u32 },
    ListFiles { order: i32 },
    SaveBackup,
    LoadBackup,
    WriteBootCode,
    EnsureSingleBootable,
}

impl RepairAction {
    pub fn name(&self) -> &'static str {
        match self {
            RepairAction::SearchPartitions { .. } => "search_partitions",
            RepairAction::ValidateGeometry => "validate_disk_geometry",
            RepairAction::WriteTable { .. } => "write_partition_table",
            RepairAction::DeleteTable => "delete_partition_table",
            RepairAction::TestStructure => "test_partition_structure",
            RepairAction::ChangeStatus {
                step: StatusStep::Next,
                ..
            } => "change_partition_status_next",
            RepairAction::ChangeStatus {
                step: StatusStep::Previous,
                ..
            } => "change_partition_status_prev",
            RepairAction::ChangeType { .. } => "change_partition_type",
            RepairAction::ListFiles { .. } => "list_partition_files",
            RepairAction::SaveBackup => "save_partition_backup",
            RepairAction::LoadBackup => "load_partition_backup",
            RepairAction::WriteBootCode => "write_mbr_code",
            RepairAction::EnsureSingleBootable => "ensure_single_bootable_partition",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self {
            RepairAction::SearchPartitions { .. } => "Failed to search partitions",
            RepairAction::ValidateGeometry => "Disk geometry validation failed",
            RepairAction::WriteTable { .. } => "Failed to write partition table",
            RepairAction::DeleteTable => "Failed to delete partition table",
            RepairAction::TestStructure => "Partition structure test failed",
            RepairAction::ChangeStatus {
                step: StatusStep::Next,
                ..
            } => "Failed to change partition status to next",
            RepairAction::ChangeStatus {
                step: StatusStep::Previous,
                ..
            } => "Failed to change partition status to previous",
            RepairAction::ChangeType { .. } => "Failed to change partition type",
            RepairAction::ListFiles { .. } => "Failed to list partition files",
            RepairAction::SaveBackup => "Failed to save partition backup",
            RepairAction::LoadBackup => "Failed to load partition backup",
            RepairAction::WriteBootCode => "Failed to write MBR code",
            RepairAction::EnsureSingleBootable => "Failed to ensure single bootable partition",
        }
    }

    /// Whether the action changes what is on disk.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            RepairAction::WriteTable {
                simulate: false,
                ..
            } | RepairAction::DeleteTable
                | RepairAction::WriteBootCode
        )
    }

    fn apply(&self, handle: &dyn EngineHandle) -> i32 {
        match *self {
            RepairAction::SearchPartitions { fast_mode, dump } => {
                handle.search_partitions(fast_mode, dump)
            }
            RepairAction::ValidateGeometry => handle.validate_geometry(),
            RepairAction::WriteTable {
                simulate,
                no_confirm,
            } => handle.write_partition_table(simulate, no_confirm),
            RepairAction::DeleteTable => handle.delete_partition_table(),
            RepairAction::TestStructure => handle.test_partition_structure(),
            RepairAction::ChangeStatus { order, step } => handle.change_partition_status(order, step),
            RepairAction::ChangeType { order, part_type } => {
                handle.change_partition_type(order, part_type)
            }
            RepairAction::ListFiles { order } => handle.list_partition_files(order),
            RepairAction::SaveBackup => handle.save_partition_backup(),
            RepairAction::LoadBackup => handle.load_partition_backup(),
            RepairAction::WriteBootCode => handle.write_mbr_code(),
            RepairAction::EnsureSingleBootable => handle.ensure_single_bootable(),
        }
    }
}

/// Engine result of a successful repair action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairOutcome {
    pub result: i32,
}

impl ContextRegistry {
    pub fn repair(
        &self,
        context_id: &str,
        action: RepairAction,
    ) -> Result<RepairOutcome, ServiceError> {
        let handle = self.get(context_id)?;
        if action.is_destructive() {
            warn!(context_id = %context_id, action = action.name(), "Destructive partition operation");
        } else {
            debug!(context_id = %context_id, action = ?action, "Partition repair");
        }

        let code = action.apply(handle.as_ref());
        if code != REPAIR_OK {
            warn!(context_id = %context_id, action = action.name(), code, "Partition repair failed");
            return Err(ServiceError::RepairFailed {
                message: action.failure_message(),
                code,
            });
        }
        info!(context_id = %context_id, action = action.name(), "Partition repair succeeded");
        Ok(RepairOutcome { result: code })
    }
}
