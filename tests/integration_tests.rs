// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use camtelemetry::aggregator::Aggregator;
use camtelemetry::config::AppConfig;
use camtelemetry::models::{CpuStats, MemoryStats, TopSnapshot, TopState};
use camtelemetry::routes;
use chrono::Utc;
use common::{batch, fix_json, ts};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(images: &TempDir) -> AppConfig {
    let toml = format!(
        r#"
[server]
port = 8080
host = "127.0.0.1"

[watch]
images_path = "{}"
gps_path = "/unused/gps"
"#,
        images.path().display()
    );
    AppConfig::load_from_str(&toml).unwrap()
}

fn test_app() -> (axum::Router, Arc<Aggregator>, TempDir) {
    let images = TempDir::new().unwrap();
    let config = test_config(&images);
    let aggregator = Arc::new(Aggregator::from_config(&config).unwrap());
    let app = routes::app(aggregator.clone(), config);
    (app, aggregator, images)
}

fn snapshot() -> TopSnapshot {
    TopSnapshot {
        timestamp: Utc::now(),
        frame_stats: Default::default(),
        memory: MemoryStats {
            total: 4096,
            used: 1024,
            ..Default::default()
        },
        cpu: CpuStats {
            user: 12.5,
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_root_endpoint() {
    let (app, _, _dir) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("camtelemetry");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (app, _, _dir) = test_app();
    let server = TestServer::new(app);
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("camtelemetry")
    );
    let version = json.get("version").and_then(|v| v.as_str()).unwrap();
    assert_eq!(
        camtelemetry::version::banner(),
        format!("camtelemetry {version}")
    );
}

#[tokio::test]
async fn test_top_endpoint_before_and_after_sampling() {
    let (app, aggregator, _dir) = test_app();
    let server = TestServer::new(app);

    let state: TopState = server.get("/top").await.json();
    assert!(state.top.is_none());
    assert!(!state.stale);

    let snap = snapshot();
    aggregator.publish_top(snap);
    aggregator.mark_top_stale();
    let state: TopState = server.get("/top").await.json();
    assert_eq!(state.top.unwrap().memory.used, 1024);
    assert!(state.stale);
}

#[tokio::test]
async fn test_gps_endpoint() {
    let (app, aggregator, _dir) = test_app();
    let server = TestServer::new(app);

    let json: serde_json::Value = server.get("/gps").await.json();
    assert_eq!(json["stale"], false);
    assert_eq!(json["metrics"].as_object().unwrap().len(), 7);
    assert_eq!(json["metrics"]["hdop"].as_array().unwrap().len(), 0);

    aggregator
        .gps()
        .ingest_batch(&batch(&[
            fix_json("3D", 1.0, ts(12, 0, 0)),
            fix_json("3D", 3.0, ts(12, 0, 20)),
        ]))
        .unwrap();
    let json: serde_json::Value = server.get("/gps").await.json();
    let hdop = &json["metrics"]["hdop"][0];
    assert_eq!(hdop["count"], 2);
    assert_eq!(hdop["value"], 2.0);
    assert_eq!(json["metrics"]["sat_seen"][0]["value"], 12.0);
}

#[tokio::test]
async fn test_frames_endpoint() {
    let (app, aggregator, _dir) = test_app();
    let server = TestServer::new(app);

    for i in 0..10 {
        aggregator.frames().observe(&format!("f{i}.jpg"), 300, ts(12, 0, 0));
    }
    aggregator.frames().tick_window();

    let json: serde_json::Value = server.get("/frames").await.json();
    assert_eq!(json["framerate"], 2);
    assert_eq!(json["frameAverageSize"], 300);
    assert_eq!(json["frameTotalCount"], 10);
}

#[tokio::test]
async fn test_lastframe_endpoint() {
    let (app, aggregator, _dir) = test_app();
    let server = TestServer::new(app);

    server
        .get("/lastframe")
        .await
        .assert_status(StatusCode::NO_CONTENT);

    aggregator.frames().observe("frame-0042.jpg", 777, ts(12, 0, 0));
    let response = server.get("/lastframe").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["filename"], "frame-0042.jpg");
    assert_eq!(json["size"], 777);
}

#[tokio::test]
async fn test_framejpg_serves_file() {
    let (app, _, dir) = test_app();
    std::fs::write(dir.path().join("frame-1.jpg"), b"\xff\xd8jpeg").unwrap();
    let server = TestServer::new(app);

    let response = server.get("/framejpg/frame-1.jpg").await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/jpeg");
    assert_eq!(response.as_bytes().as_ref(), b"\xff\xd8jpeg");
}

#[tokio::test]
async fn test_framejpg_missing_is_404() {
    let (app, _, _dir) = test_app();
    let server = TestServer::new(app);
    server
        .get("/framejpg/nope.jpg")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_framejpg_rejects_path_separators() {
    let (app, _, _dir) = test_app();
    let server = TestServer::new(app);
    server
        .get("/framejpg/..%5Csecret")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .get("/framejpg/..")
        .await
        .assert_status_not_ok();
}

// --- WebSocket tests (require http_transport + ws feature) ---
// Receive until we get valid JSON (server may send Ping first).

async fn receive_first_json_text<T: serde::de::DeserializeOwned>(
    ws: &mut axum_test::TestWebSocket,
) -> T {
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(3);
    loop {
        let text = ws.receive_text().await;
        if let Ok(v) = serde_json::from_str::<T>(&text) {
            return v;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for JSON"
        );
    }
}

#[tokio::test]
async fn test_ws_top_sends_current_then_updates() {
    let (app, aggregator, _dir) = test_app();
    let server = TestServer::builder().http_transport().build(app);
    let mut ws = server.get_websocket("/ws/top").await.into_websocket().await;

    let first: TopState = receive_first_json_text(&mut ws).await;
    assert!(first.top.is_none());

    aggregator.publish_top(snapshot());
    let next: TopState = receive_first_json_text(&mut ws).await;
    let top = next.top.expect("published snapshot");
    assert_eq!(top.cpu.user, 12.5);
    assert!(!next.stale);
}
