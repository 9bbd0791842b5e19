//! JSON request and response bodies for the RPC routes.
//!
//! Every response is a [`Reply`]: `success`, an `error_message` on failure,
//! and the operation's payload under `data` on success.

use crate::context::{RepairOutcome, StatisticsReport};
use crate::engine::{ArchInfo, DiskInfo, FileTypeOption, PartitionInfo};
use crate::error::ServiceError;
use crate::liveness::Heartbeat;
use crate::recovery::{RecoveryOptions, StatusSnapshot};
use crate::shutdown::ShutdownReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::engine::InitArgs as CreateContextRequest;
pub use crate::service::StartRecovery as StartRecoveryRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error_message: None,
            data: Some(data),
        }
    }

    pub fn failure(error: &ServiceError) -> Self {
        Self {
            success: false,
            error_message: Some(error.to_string()),
            data: None,
        }
    }

    pub fn from_result(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failure(&e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub context_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContextResponse {
    pub context_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisksResponse {
    pub disks: Vec<DiskInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddImageRequest {
    pub context_id: String,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddImageResponse {
    pub disk: DiskInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionsRequest {
    pub context_id: String,
    /// Selected before listing when present
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionsResponse {
    pub partitions: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchsResponse {
    pub architectures: Vec<ArchInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetArchRequest {
    pub context_id: String,
    /// Missing or empty autodetects
    #[serde(default)]
    pub arch_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetArchResponse {
    pub selected: ArchInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOptionsResponse {
    pub file_types: Vec<FileTypeOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureOptionsRequest {
    pub context_id: String,
    #[serde(default)]
    pub options: RecoveryOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRecoveryResponse {
    pub recovery_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryRequest {
    pub recovery_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveriesResponse {
    pub recoveries: Vec<StatusSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownRequest {
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLogLevelRequest {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLogLevelResponse {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPartitionsRequest {
    pub context_id: String,
    #[serde(default)]
    pub fast_mode: bool,
    /// Log every partition found
    #[serde(default)]
    pub dump: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritePartitionTableRequest {
    pub context_id: String,
    /// Check the structure without writing; on by default
    #[serde(default = "simulate_by_default")]
    pub simulate: bool,
    #[serde(default)]
    pub no_confirm: bool,
}

fn simulate_by_default() -> bool {
    true
}

/// Request for operations that write to the selected disk. `device` is only
/// logged; the context's selection decides the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskWriteRequest {
    pub context_id: String,
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOrderRequest {
    pub context_id: String,
    pub order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePartitionTypeRequest {
    pub context_id: String,
    pub order: i32,
    pub part_type: u32,
}

/// Empty payload for operations that only report success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

pub type StatisticsResponse = StatisticsReport;
pub type StatusResponse = StatusSnapshot;
pub type ShutdownResponse = ShutdownReport;
pub type HeartbeatResponse = Heartbeat;
pub type RepairResponse = RepairOutcome;

/// Route paths, shared by the router and the client.
pub mod routes {
    pub const CREATE_CONTEXT: &str = "/rpc/create_context";
    pub const GET_DISKS: &str = "/rpc/get_disks";
    pub const ADD_IMAGE: &str = "/rpc/add_image";
    pub const GET_PARTITIONS: &str = "/rpc/get_partitions";
    pub const GET_ARCHS: &str = "/rpc/get_archs";
    pub const SET_ARCH: &str = "/rpc/set_arch";
    pub const GET_FILE_OPTIONS: &str = "/rpc/get_file_options";
    pub const CONFIGURE_OPTIONS: &str = "/rpc/configure_options";
    pub const START_RECOVERY: &str = "/rpc/start_recovery";
    pub const GET_RECOVERY_STATUS: &str = "/rpc/get_recovery_status";
    pub const STOP_RECOVERY: &str = "/rpc/stop_recovery";
    pub const LIST_RECOVERIES: &str = "/rpc/list_recoveries";
    pub const GET_STATISTICS: &str = "/rpc/get_statistics";
    pub const CLEANUP: &str = "/rpc/cleanup";
    pub const SHUTDOWN: &str = "/rpc/shutdown";
    pub const HEARTBEAT: &str = "/rpc/heartbeat";
    pub const SET_LOG_LEVEL: &str = "/rpc/set_log_level";
    pub const SEARCH_PARTITIONS: &str = "/rpc/search_partitions";
    pub const VALIDATE_DISK_GEOMETRY: &str = "/rpc/validate_disk_geometry";
    pub const WRITE_PARTITION_TABLE: &str = "/rpc/write_partition_table";
    pub const DELETE_PARTITION_TABLE: &str = "/rpc/delete_partition_table";
    pub const TEST_PARTITION_STRUCTURE: &str = "/rpc/test_partition_structure";
    pub const CHANGE_PARTITION_STATUS_NEXT: &str = "/rpc/change_partition_status_next";
    pub const CHANGE_PARTITION_STATUS_PREV: &str = "/rpc/change_partition_status_prev";
    pub const CHANGE_PARTITION_TYPE: &str = "/rpc/change_partition_type";
    pub const LIST_PARTITION_FILES: &str = "/rpc/list_partition_files";
    pub const SAVE_PARTITION_BACKUP: &str = "/rpc/save_partition_backup";
    pub const LOAD_PARTITION_BACKUP: &str = "/rpc/load_partition_backup";
    pub const WRITE_MBR_CODE: &str = "/rpc/write_mbr_code";
    pub const ENSURE_SINGLE_BOOTABLE_PARTITION: &str = "/rpc/ensure_single_bootable_partition";
}
