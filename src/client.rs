//! RPC client for a running recovery server.

use crate::context::{RepairAction, StatisticsReport};
use crate::engine::{ArchInfo, DiskInfo, FileTypeOption, InitArgs, PartitionInfo, StatusStep};
use crate::liveness::Heartbeat;
use crate::recovery::{RecoveryOptions, StatusSnapshot};
use crate::server::wire::*;
use crate::service::StartRecovery;
use crate::shutdown::ShutdownReport;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const CLIENT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered `success = false`
    #[error("{0}")]
    Rpc(String),

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

fn map_http_error(error: reqwest::Error) -> ClientError {
    if let Some(status) = error.status() {
        ClientError::Status {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else if error.is_connect() || error.is_timeout() {
        ClientError::Connect(error.to_string())
    } else if error.is_decode() {
        ClientError::Malformed(error.to_string())
    } else {
        ClientError::Http(error.to_string())
    }
}

/// Async client speaking the `/rpc/*` JSON protocol.
#[derive(Clone)]
pub struct RecoveryClient {
    client: Client,
    base_url: String,
}

impl RecoveryClient {
    /// `address` is `host:port` or a full `http://` URL.
    pub fn new(address: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(CLIENT_CONNECT_TIMEOUT)
            .build()
            .map_err(map_http_error)?;
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address)
        };
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<Req, Resp>(&self, route: &str, request: &Req) -> Result<Resp, ClientError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        debug!(route = %route, "RPC call");
        let reply: Reply<Resp> = self
            .client
            .post(format!("{}{}", self.base_url, route))
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?
            .error_for_status()
            .map_err(map_http_error)?
            .json()
            .await
            .map_err(map_http_error)?;

        if !reply.success {
            return Err(ClientError::Rpc(
                reply
                    .error_message
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        reply
            .data
            .ok_or_else(|| ClientError::Malformed(format!("{} returned no data", route)))
    }

    pub async fn create_context(&self, args: &InitArgs) -> Result<String, ClientError> {
        let resp: CreateContextResponse = self.call(routes::CREATE_CONTEXT, args).await?;
        Ok(resp.context_id)
    }

    pub async fn disks(&self, context_id: &str) -> Result<Vec<DiskInfo>, ClientError> {
        let resp: DisksResponse = self.call(routes::GET_DISKS, &context(context_id)).await?;
        Ok(resp.disks)
    }

    pub async fn add_image(&self, context_id: &str, image: &Path) -> Result<DiskInfo, ClientError> {
        let req = AddImageRequest {
            context_id: context_id.to_string(),
            image_path: image.to_path_buf(),
        };
        let resp: AddImageResponse = self.call(routes::ADD_IMAGE, &req).await?;
        Ok(resp.disk)
    }

    pub async fn partitions(
        &self,
        context_id: &str,
        device: Option<&str>,
    ) -> Result<Vec<PartitionInfo>, ClientError> {
        let req = PartitionsRequest {
            context_id: context_id.to_string(),
            device: device.map(str::to_string),
        };
        let resp: PartitionsResponse = self.call(routes::GET_PARTITIONS, &req).await?;
        Ok(resp.partitions)
    }

    pub async fn architectures(&self, context_id: &str) -> Result<Vec<ArchInfo>, ClientError> {
        let resp: ArchsResponse = self.call(routes::GET_ARCHS, &context(context_id)).await?;
        Ok(resp.architectures)
    }

    pub async fn set_architecture(
        &self,
        context_id: &str,
        arch_name: Option<&str>,
    ) -> Result<ArchInfo, ClientError> {
        let req = SetArchRequest {
            context_id: context_id.to_string(),
            arch_name: arch_name.map(str::to_string),
        };
        let resp: SetArchResponse = self.call(routes::SET_ARCH, &req).await?;
        Ok(resp.selected)
    }

    pub async fn file_options(&self, context_id: &str) -> Result<Vec<FileTypeOption>, ClientError> {
        let resp: FileOptionsResponse =
            self.call(routes::GET_FILE_OPTIONS, &context(context_id)).await?;
        Ok(resp.file_types)
    }

    pub async fn configure_options(
        &self,
        context_id: &str,
        options: &RecoveryOptions,
    ) -> Result<(), ClientError> {
        let req = ConfigureOptionsRequest {
            context_id: context_id.to_string(),
            options: options.clone(),
        };
        let _: Empty = self.call(routes::CONFIGURE_OPTIONS, &req).await?;
        Ok(())
    }

    pub async fn start_recovery(&self, request: &StartRecovery) -> Result<String, ClientError> {
        let resp: StartRecoveryResponse = self.call(routes::START_RECOVERY, request).await?;
        Ok(resp.recovery_id)
    }

    pub async fn recovery_status(&self, recovery_id: &str) -> Result<StatusSnapshot, ClientError> {
        self.call(routes::GET_RECOVERY_STATUS, &recovery(recovery_id)).await
    }

    pub async fn stop_recovery(&self, recovery_id: &str) -> Result<(), ClientError> {
        let _: Empty = self.call(routes::STOP_RECOVERY, &recovery(recovery_id)).await?;
        Ok(())
    }

    pub async fn list_recoveries(&self) -> Result<Vec<StatusSnapshot>, ClientError> {
        let resp: RecoveriesResponse = self.call(routes::LIST_RECOVERIES, &Empty {}).await?;
        Ok(resp.recoveries)
    }

    pub async fn statistics(&self, context_id: &str) -> Result<StatisticsReport, ClientError> {
        self.call(routes::GET_STATISTICS, &context(context_id)).await
    }

    pub async fn cleanup(&self, context_id: &str) -> Result<(), ClientError> {
        let _: Empty = self.call(routes::CLEANUP, &context(context_id)).await?;
        Ok(())
    }

    pub async fn shutdown(&self, force: bool, reason: Option<&str>) -> Result<ShutdownReport, ClientError> {
        let req = ShutdownRequest {
            force,
            reason: reason.map(str::to_string),
        };
        self.call(routes::SHUTDOWN, &req).await
    }

    pub async fn heartbeat(&self, context_id: Option<&str>) -> Result<Heartbeat, ClientError> {
        let req = HeartbeatRequest {
            context_id: context_id.map(str::to_string),
        };
        self.call(routes::HEARTBEAT, &req).await
    }

    pub async fn set_log_level(&self, level: &str) -> Result<String, ClientError> {
        let req = SetLogLevelRequest {
            level: level.to_string(),
        };
        let resp: SetLogLevelResponse = self.call(routes::SET_LOG_LEVEL, &req).await?;
        Ok(resp.level)
    }

    /// Run one partition repair action; returns the engine's result code.
    pub async fn repair(&self, context_id: &str, action: RepairAction) -> Result<i32, ClientError> {
        let context_id = context_id.to_string();
        let resp: RepairResponse = match action {
            RepairAction::SearchPartitions { fast_mode, dump } => {
                let req = SearchPartitionsRequest {
                    context_id,
                    fast_mode,
                    dump,
                };
                self.call(routes::SEARCH_PARTITIONS, &req).await?
            }
            RepairAction::ValidateGeometry => {
                self.call(routes::VALIDATE_DISK_GEOMETRY, &ContextRequest { context_id })
                    .await?
            }
            RepairAction::WriteTable {
                simulate,
                no_confirm,
            } => {
                let req = WritePartitionTableRequest {
                    context_id,
                    simulate,
                    no_confirm,
                };
                self.call(routes::WRITE_PARTITION_TABLE, &req).await?
            }
            RepairAction::DeleteTable => {
                let req = DiskWriteRequest {
                    context_id,
                    device: None,
                };
                self.call(routes::DELETE_PARTITION_TABLE, &req).await?
            }
            RepairAction::TestStructure => {
                self.call(routes::TEST_PARTITION_STRUCTURE, &ContextRequest { context_id })
                    .await?
            }
            RepairAction::ChangeStatus { order, step } => {
                let route = match step {
                    StatusStep::Next => routes::CHANGE_PARTITION_STATUS_NEXT,
                    StatusStep::Previous => routes::CHANGE_PARTITION_STATUS_PREV,
                };
                self.call(route, &PartitionOrderRequest { context_id, order })
                    .await?
            }
            RepairAction::ChangeType { order, part_type } => {
                let req = ChangePartitionTypeRequest {
                    context_id,
                    order,
                    part_type,
                };
                self.call(routes::CHANGE_PARTITION_TYPE, &req).await?
            }
            RepairAction::ListFiles { order } => {
                self.call(
                    routes::LIST_PARTITION_FILES,
                    &PartitionOrderRequest { context_id, order },
                )
                .await?
            }
            RepairAction::SaveBackup => {
                self.call(routes::SAVE_PARTITION_BACKUP, &ContextRequest { context_id })
                    .await?
            }
            RepairAction::LoadBackup => {
                self.call(routes::LOAD_PARTITION_BACKUP, &ContextRequest { context_id })
                    .await?
            }
            RepairAction::WriteBootCode => {
                let req = DiskWriteRequest {
                    context_id,
                    device: None,
                };
                self.call(routes::WRITE_MBR_CODE, &req).await?
            }
            RepairAction::EnsureSingleBootable => {
                self.call(
                    routes::ENSURE_SINGLE_BOOTABLE_PARTITION,
                    &ContextRequest { context_id },
                )
                .await?
            }
        };
        debug!(action = action.name(), result = resp.result, "Partition repair done");
        Ok(resp.result)
    }

    /// Poll a recovery until it completes, handing each snapshot to `on_update`.
    pub async fn wait_for_completion(
        &self,
        recovery_id: &str,
        poll: Duration,
        mut on_update: impl FnMut(&StatusSnapshot),
    ) -> Result<StatusSnapshot, ClientError> {
        loop {
            let snapshot = self.recovery_status(recovery_id).await?;
            on_update(&snapshot);
            if snapshot.is_complete {
                return Ok(snapshot);
            }
            tokio::time::sleep(poll).await;
        }
    }
}

fn context(context_id: &str) -> ContextRequest {
    ContextRequest {
        context_id: context_id.to_string(),
    }
}

fn recovery(recovery_id: &str) -> RecoveryRequest {
    RecoveryRequest {
        recovery_id: recovery_id.to_string(),
    }
}
