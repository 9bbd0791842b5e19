//! Route handlers.
//!
//! Handlers that may block on engine work or thread joins go through
//! `spawn_blocking`; the rest answer inline. Business failures are always a
//! 200 response with `success = false`.

use crate::context::RepairAction;
use crate::engine::StatusStep;
use crate::error::ServiceError;
use crate::server::wire::*;
use crate::service::RecoveryService;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub type SharedService = Arc<RecoveryService>;

async fn blocking<T, F>(service: SharedService, op: F) -> Json<Reply<T>>
where
    T: Send + 'static,
    F: FnOnce(&RecoveryService) -> Result<T, ServiceError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || op(&service)).await {
        Ok(result) => Json(Reply::from_result(result)),
        Err(e) => {
            error!(error = %e, "Blocking handler failed");
            Json(Reply::failure(&ServiceError::WorkerFault(e.to_string())))
        }
    }
}

pub async fn create_context(
    State(service): State<SharedService>,
    Json(req): Json<CreateContextRequest>,
) -> Json<Reply<CreateContextResponse>> {
    debug!(args = ?req.args, "CreateContext");
    blocking(service, move |s| {
        s.create_context(&req)
            .map(|context_id| CreateContextResponse { context_id })
    })
    .await
}

pub async fn get_disks(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<DisksResponse>> {
    blocking(service, move |s| {
        s.disks(&req.context_id).map(|disks| DisksResponse { disks })
    })
    .await
}

pub async fn add_image(
    State(service): State<SharedService>,
    Json(req): Json<AddImageRequest>,
) -> Json<Reply<AddImageResponse>> {
    blocking(service, move |s| {
        s.add_image(&req.context_id, &req.image_path)
            .map(|disk| AddImageResponse { disk })
    })
    .await
}

pub async fn get_partitions(
    State(service): State<SharedService>,
    Json(req): Json<PartitionsRequest>,
) -> Json<Reply<PartitionsResponse>> {
    blocking(service, move |s| {
        s.partitions(&req.context_id, req.device.as_deref())
            .map(|partitions| PartitionsResponse { partitions })
    })
    .await
}

pub async fn get_archs(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<ArchsResponse>> {
    Json(Reply::from_result(
        service
            .architectures(&req.context_id)
            .map(|architectures| ArchsResponse { architectures }),
    ))
}

pub async fn set_arch(
    State(service): State<SharedService>,
    Json(req): Json<SetArchRequest>,
) -> Json<Reply<SetArchResponse>> {
    blocking(service, move |s| {
        s.set_architecture(&req.context_id, req.arch_name.as_deref())
            .map(|selected| SetArchResponse { selected })
    })
    .await
}

pub async fn get_file_options(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<FileOptionsResponse>> {
    Json(Reply::from_result(
        service
            .file_options(&req.context_id)
            .map(|file_types| FileOptionsResponse { file_types }),
    ))
}

pub async fn configure_options(
    State(service): State<SharedService>,
    Json(req): Json<ConfigureOptionsRequest>,
) -> Json<Reply<Empty>> {
    Json(Reply::from_result(
        service
            .configure_options(&req.context_id, &req.options)
            .map(|_| Empty {}),
    ))
}

pub async fn start_recovery(
    State(service): State<SharedService>,
    Json(req): Json<StartRecoveryRequest>,
) -> Json<Reply<StartRecoveryResponse>> {
    blocking(service, move |s| {
        s.start_recovery(req)
            .map(|recovery_id| StartRecoveryResponse { recovery_id })
    })
    .await
}

pub async fn get_recovery_status(
    State(service): State<SharedService>,
    Json(req): Json<RecoveryRequest>,
) -> Json<Reply<StatusResponse>> {
    Json(Reply::from_result(service.recovery_status(&req.recovery_id)))
}

pub async fn stop_recovery(
    State(service): State<SharedService>,
    Json(req): Json<RecoveryRequest>,
) -> Json<Reply<Empty>> {
    blocking(service, move |s| {
        s.stop_recovery(&req.recovery_id).map(|_| Empty {})
    })
    .await
}

pub async fn list_recoveries(State(service): State<SharedService>) -> Json<Reply<RecoveriesResponse>> {
    Json(Reply::ok(RecoveriesResponse {
        recoveries: service.list_recoveries(),
    }))
}

pub async fn get_statistics(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<StatisticsResponse>> {
    Json(Reply::from_result(service.statistics(&req.context_id)))
}

pub async fn cleanup(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<Empty>> {
    blocking(service, move |s| s.cleanup(&req.context_id).map(|_| Empty {})).await
}

pub async fn shutdown(
    State(service): State<SharedService>,
    Json(req): Json<ShutdownRequest>,
) -> Json<Reply<ShutdownResponse>> {
    blocking(service, move |s| s.shutdown(req.force, req.reason.as_deref())).await
}

pub async fn heartbeat(
    State(service): State<SharedService>,
    Json(req): Json<HeartbeatRequest>,
) -> Json<Reply<HeartbeatResponse>> {
    Json(Reply::from_result(service.heartbeat(req.context_id.as_deref())))
}

pub async fn set_log_level(
    State(service): State<SharedService>,
    Json(req): Json<SetLogLevelRequest>,
) -> Json<Reply<SetLogLevelResponse>> {
    Json(Reply::from_result(
        service
            .set_log_level(&req.level)
            .map(|level| SetLogLevelResponse { level }),
    ))
}

// Partition repair

async fn repair(
    service: SharedService,
    context_id: String,
    action: RepairAction,
) -> Json<Reply<RepairResponse>> {
    blocking(service, move |s| s.repair(&context_id, action)).await
}

pub async fn search_partitions(
    State(service): State<SharedService>,
    Json(req): Json<SearchPartitionsRequest>,
) -> Json<Reply<RepairResponse>> {
    let action = RepairAction::SearchPartitions {
        fast_mode: req.fast_mode,
        dump: req.dump,
    };
    repair(service, req.context_id, action).await
}

pub async fn validate_disk_geometry(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::ValidateGeometry).await
}

pub async fn write_partition_table(
    State(service): State<SharedService>,
    Json(req): Json<WritePartitionTableRequest>,
) -> Json<Reply<RepairResponse>> {
    let action = RepairAction::WriteTable {
        simulate: req.simulate,
        no_confirm: req.no_confirm,
    };
    repair(service, req.context_id, action).await
}

pub async fn delete_partition_table(
    State(service): State<SharedService>,
    Json(req): Json<DiskWriteRequest>,
) -> Json<Reply<RepairResponse>> {
    warn!(context_id = %req.context_id, device = ?req.device, "DeletePartitionTable requested");
    repair(service, req.context_id, RepairAction::DeleteTable).await
}

pub async fn test_partition_structure(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::TestStructure).await
}

pub async fn change_partition_status_next(
    State(service): State<SharedService>,
    Json(req): Json<PartitionOrderRequest>,
) -> Json<Reply<RepairResponse>> {
    let action = RepairAction::ChangeStatus {
        order: req.order,
        step: StatusStep::Next,
    };
    repair(service, req.context_id, action).await
}

pub async fn change_partition_status_prev(
    State(service): State<SharedService>,
    Json(req): Json<PartitionOrderRequest>,
) -> Json<Reply<RepairResponse>> {
    let action = RepairAction::ChangeStatus {
        order: req.order,
        step: StatusStep::Previous,
    };
    repair(service, req.context_id, action).await
}

pub async fn change_partition_type(
    State(service): State<SharedService>,
    Json(req): Json<ChangePartitionTypeRequest>,
) -> Json<Reply<RepairResponse>> {
    let action = RepairAction::ChangeType {
        order: req.order,
        part_type: req.part_type,
    };
    repair(service, req.context_id, action).await
}

pub async fn list_partition_files(
    State(service): State<SharedService>,
    Json(req): Json<PartitionOrderRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::ListFiles { order: req.order }).await
}

pub async fn save_partition_backup(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::SaveBackup).await
}

pub async fn load_partition_backup(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::LoadBackup).await
}

pub async fn write_mbr_code(
    State(service): State<SharedService>,
    Json(req): Json<DiskWriteRequest>,
) -> Json<Reply<RepairResponse>> {
    warn!(context_id = %req.context_id, device = ?req.device, "WriteMbrCode requested");
    repair(service, req.context_id, RepairAction::WriteBootCode).await
}

pub async fn ensure_single_bootable_partition(
    State(service): State<SharedService>,
    Json(req): Json<ContextRequest>,
) -> Json<Reply<RepairResponse>> {
    repair(service, req.context_id, RepairAction::EnsureSingleBootable).await
}
