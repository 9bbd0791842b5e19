//! Integration tests for the recovery session service

mod concurrency;
mod config_layers;
mod rpc_router;
mod service_lifecycle;
mod shutdown_coordination;
mod test_utils;
