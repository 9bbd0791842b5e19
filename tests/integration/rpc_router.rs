//! The JSON router driven in-process with `tower::ServiceExt::oneshot`.

use super::test_utils::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use recoverd::server::{router, wire::routes};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

async fn post(app: &axum::Router, route: &str, body: Value) -> Value {
    let request = Request::builder()
        .method("POST")
        .uri(route)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn context_operations_round_trip_through_the_router() {
    let app = router(service());

    let created = post(&app, routes::CREATE_CONTEXT, json!({})).await;
    assert_eq!(created["success"], true);
    let ctx = created["data"]["context_id"].as_str().unwrap().to_string();
    assert!(ctx.starts_with("ctx_"));

    let disks = post(&app, routes::GET_DISKS, json!({ "context_id": ctx })).await;
    assert_eq!(disks["data"]["disks"].as_array().unwrap().len(), 2);

    let parts = post(
        &app,
        routes::GET_PARTITIONS,
        json!({ "context_id": ctx, "device": SMALL_DISK }),
    )
    .await;
    assert_eq!(parts["success"], true);
    assert!(!parts["data"]["partitions"].as_array().unwrap().is_empty());

    let archs = post(&app, routes::GET_ARCHS, json!({ "context_id": ctx })).await;
    assert!(!archs["data"]["architectures"].as_array().unwrap().is_empty());

    let cleaned = post(&app, routes::CLEANUP, json!({ "context_id": ctx })).await;
    assert_eq!(cleaned["success"], true);
    assert!(cleaned.get("error_message").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn business_failures_are_successful_http_responses() {
    let app = router(service());

    let disks = post(&app, routes::GET_DISKS, json!({ "context_id": "ctx_nope" })).await;
    assert_eq!(disks["success"], false);
    assert_eq!(disks["error_message"], "Invalid context ID: ctx_nope");
    assert!(disks.get("data").is_none());

    let status = post(
        &app,
        routes::GET_RECOVERY_STATUS,
        json!({ "recovery_id": "rec_nope" }),
    )
    .await;
    assert_eq!(status["success"], false);
    assert_eq!(status["error_message"], "Invalid recovery ID: rec_nope");

    let created = post(&app, routes::CREATE_CONTEXT, json!({})).await;
    let ctx = created["data"]["context_id"].as_str().unwrap().to_string();
    let parts = post(&app, routes::GET_PARTITIONS, json!({ "context_id": ctx })).await;
    assert_eq!(parts["success"], false);
    assert!(parts["error_message"]
        .as_str()
        .unwrap()
        .starts_with("No disk selected"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn recovery_can_be_started_and_polled() {
    let out = TempDir::new().unwrap();
    let app = router(service());
    let created = post(&app, routes::CREATE_CONTEXT, json!({})).await;
    let ctx = created["data"]["context_id"].as_str().unwrap().to_string();

    let started = post(
        &app,
        routes::START_RECOVERY,
        json!({
            "context_id": ctx,
            "device": SMALL_DISK,
            "output_dir": out.path().join("run"),
        }),
    )
    .await;
    assert_eq!(started["success"], true);
    let id = started["data"]["recovery_id"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..500 {
        last = post(&app, routes::GET_RECOVERY_STATUS, json!({ "recovery_id": id })).await;
        if last["data"]["is_complete"] == true {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(last["data"]["is_complete"], true);
    assert_eq!(last["data"]["status"], "Completed successfully");

    let listed = post(&app, routes::LIST_RECOVERIES, json!({})).await;
    assert_eq!(listed["data"]["recoveries"].as_array().unwrap().len(), 1);

    let stopped = post(&app, routes::STOP_RECOVERY, json!({ "recovery_id": id })).await;
    assert_eq!(stopped["success"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn heartbeat_and_log_level_routes() {
    let app = router(service());

    let beat = post(&app, routes::HEARTBEAT, json!({})).await;
    assert_eq!(beat["success"], true);
    assert_eq!(beat["data"]["server_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(beat["data"]["active_contexts"], 0);

    let unknown = post(&app, routes::HEARTBEAT, json!({ "context_id": "ctx_gone" })).await;
    assert_eq!(unknown["success"], false);

    let level = post(&app, routes::SET_LOG_LEVEL, json!({ "level": "DEBUG" })).await;
    assert_eq!(level["data"]["level"], "debug");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_route_reports_denial_and_acceptance() {
    let out = TempDir::new().unwrap();
    let service = service();
    let app = router(service.clone());
    let ctx = service.create_context(&Default::default()).unwrap();
    let id = start(&service, &ctx, HUGE_DISK, -1, out.path());

    let denied = post(&app, routes::SHUTDOWN, json!({ "force": false })).await;
    assert_eq!(denied["success"], false);
    assert!(denied["error_message"]
        .as_str()
        .unwrap()
        .contains("1 active recovery sessions"));

    let forced = post(&app, routes::SHUTDOWN, json!({ "force": true, "reason": "test" })).await;
    assert_eq!(forced["success"], true);
    assert_eq!(forced["data"]["stopped_sessions"], 1);
    assert_eq!(service.recovery_status(&id).unwrap().status, "Aborted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn partition_repair_routes() {
    let app = router(service());
    let created = post(&app, routes::CREATE_CONTEXT, json!({})).await;
    let ctx = created["data"]["context_id"].as_str().unwrap().to_string();
    let context = json!({ "context_id": ctx });
    let order = |order: i32| json!({ "context_id": ctx, "order": order });
    let partition_count = |reply: Value| reply["data"]["partitions"].as_array().unwrap().len();

    // Without a selected disk the engine refuses.
    let early = post(&app, routes::TEST_PARTITION_STRUCTURE, context.clone()).await;
    assert_eq!(early["success"], false);
    assert_eq!(early["error_message"], "Partition structure test failed (result code 1)");

    let parts = post(&app, routes::GET_PARTITIONS, json!({ "context_id": ctx, "device": SMALL_DISK })).await;
    assert_eq!(partition_count(parts), 2);

    let deleted = post(
        &app,
        routes::DELETE_PARTITION_TABLE,
        json!({ "context_id": ctx, "device": SMALL_DISK }),
    )
    .await;
    assert_eq!(deleted["success"], true);
    assert_eq!(deleted["data"]["result"], 0);
    assert_eq!(partition_count(post(&app, routes::GET_PARTITIONS, context.clone()).await), 1);

    let searched = post(
        &app,
        routes::SEARCH_PARTITIONS,
        json!({ "context_id": ctx, "fast_mode": true }),
    )
    .await;
    assert_eq!(searched["success"], true);
    for route in [
        routes::VALIDATE_DISK_GEOMETRY,
        routes::TEST_PARTITION_STRUCTURE,
        routes::SAVE_PARTITION_BACKUP,
        routes::LOAD_PARTITION_BACKUP,
        routes::ENSURE_SINGLE_BOOTABLE_PARTITION,
    ] {
        let reply = post(&app, route, context.clone()).await;
        assert_eq!(reply["success"], true, "{}", route);
    }

    // Default write only checks the structure.
    let simulated = post(&app, routes::WRITE_PARTITION_TABLE, context.clone()).await;
    assert_eq!(simulated["success"], true);
    assert_eq!(partition_count(post(&app, routes::GET_PARTITIONS, context.clone()).await), 1);

    for route in [routes::CHANGE_PARTITION_STATUS_PREV, routes::CHANGE_PARTITION_STATUS_NEXT] {
        assert_eq!(post(&app, route, order(1)).await["success"], true, "{}", route);
    }
    let retyped = post(
        &app,
        routes::CHANGE_PARTITION_TYPE,
        json!({ "context_id": ctx, "order": 1, "part_type": 0x83 }),
    )
    .await;
    assert_eq!(retyped["success"], true);

    let written = post(
        &app,
        routes::WRITE_PARTITION_TABLE,
        json!({ "context_id": ctx, "simulate": false, "no_confirm": true }),
    )
    .await;
    assert_eq!(written["success"], true);
    let parts = post(&app, routes::GET_PARTITIONS, context.clone()).await;
    let entries = parts["data"]["partitions"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["filesystem"], "Linux");
    assert_eq!(entries[1]["status"], "PrimaryBoot");

    assert_eq!(post(&app, routes::LIST_PARTITION_FILES, order(1)).await["success"], true);
    let missing = post(&app, routes::LIST_PARTITION_FILES, order(9)).await;
    assert_eq!(missing["success"], false);
    assert_eq!(missing["error_message"], "Failed to list partition files (result code 2)");

    let boot = post(&app, routes::WRITE_MBR_CODE, json!({ "context_id": ctx })).await;
    assert_eq!(boot["success"], true);

    let unknown = post(
        &app,
        routes::SEARCH_PARTITIONS,
        json!({ "context_id": "ctx_nope" }),
    )
    .await;
    assert_eq!(unknown["success"], false);
    assert_eq!(unknown["error_message"], "Invalid context ID: ctx_nope");
}
