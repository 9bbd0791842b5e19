//! RPC server
//!
//! JSON over HTTP: every operation is `POST /rpc/<method>`. The listener runs
//! until the service's shutdown signal flips or the process receives SIGINT
//! or SIGTERM.

pub mod handlers;
pub mod wire;

use crate::error::ServiceError;
use crate::service::RecoveryService;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use wire::routes;

/// Build the RPC router over `service`.
pub fn router(service: Arc<RecoveryService>) -> Router {
    Router::new()
        .route(routes::CREATE_CONTEXT, post(handlers::create_context))
        .route(routes::GET_DISKS, post(handlers::get_disks))
        .route(routes::ADD_IMAGE, post(handlers::add_image))
        .route(routes::GET_PARTITIONS, post(handlers::get_partitions))
        .route(routes::GET_ARCHS, post(handlers::get_archs))
        .route(routes::SET_ARCH, post(handlers::set_arch))
        .route(routes::GET_FILE_OPTIONS, post(handlers::get_file_options))
        .route(routes::CONFIGURE_OPTIONS, post(handlers::configure_options))
        .route(routes::START_RECOVERY, post(handlers::start_recovery))
        .route(routes::GET_RECOVERY_STATUS, post(handlers::get_recovery_status))
        .route(routes::STOP_RECOVERY, post(handlers::stop_recovery))
        .route(routes::LIST_RECOVERIES, post(handlers::list_recoveries))
        .route(routes::GET_STATISTICS, post(handlers::get_statistics))
        .route(routes::CLEANUP, post(handlers::cleanup))
        .route(routes::SHUTDOWN, post(handlers::shutdown))
        .route(routes::HEARTBEAT, post(handlers::heartbeat))
        .route(routes::SET_LOG_LEVEL, post(handlers::set_log_level))
        .route(routes::SEARCH_PARTITIONS, post(handlers::search_partitions))
        .route(routes::VALIDATE_DISK_GEOMETRY, post(handlers::validate_disk_geometry))
        .route(routes::WRITE_PARTITION_TABLE, post(handlers::write_partition_table))
        .route(routes::DELETE_PARTITION_TABLE, post(handlers::delete_partition_table))
        .route(routes::TEST_PARTITION_STRUCTURE, post(handlers::test_partition_structure))
        .route(
            routes::CHANGE_PARTITION_STATUS_NEXT,
            post(handlers::change_partition_status_next),
        )
        .route(
            routes::CHANGE_PARTITION_STATUS_PREV,
            post(handlers::change_partition_status_prev),
        )
        .route(routes::CHANGE_PARTITION_TYPE, post(handlers::change_partition_type))
        .route(routes::LIST_PARTITION_FILES, post(handlers::list_partition_files))
        .route(routes::SAVE_PARTITION_BACKUP, post(handlers::save_partition_backup))
        .route(routes::LOAD_PARTITION_BACKUP, post(handlers::load_partition_backup))
        .route(routes::WRITE_MBR_CODE, post(handlers::write_mbr_code))
        .route(
            routes::ENSURE_SINGLE_BOOTABLE_PARTITION,
            post(handlers::ensure_single_bootable_partition),
        )
        .with_state(service)
}

/// Bind the listening socket. Failure here is the only fatal server error.
pub async fn bind(address: &str) -> Result<TcpListener, ServiceError> {
    let listener = TcpListener::bind(address).await.map_err(|e| {
        error!(address = %address, error = %e, "Failed to bind listener");
        e
    })?;
    info!(address = %address, "Listener bound");
    Ok(listener)
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM. A handler that cannot be
/// installed is logged and never fires.
pub async fn termination_requested() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
        info!("Interrupt received");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Terminate signal received");
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Serve until an accepted shutdown's signal, Ctrl-C, or SIGTERM.
pub async fn serve(listener: TcpListener, service: Arc<RecoveryService>) -> Result<(), ServiceError> {
    let mut stop = service.shutdown_signal();
    let app = router(Arc::clone(&service));
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, engine = service.engine_name(), "Recovery server started");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => {
                    info!("Shutdown signal received");
                }
                _ = termination_requested() => {}
            }
        })
        .await?;

    info!("Recovery server stopped");
    Ok(())
}
