// Integration tests: HTTP and WebSocket endpoints

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use clusterwatch::config::AppConfig;
use clusterwatch::history::History;
use clusterwatch::models::{Category, FrameUpdate, Metric};
use clusterwatch::poller::{Board, PollerCommand, PollerControls};
use clusterwatch::routes;
use clusterwatch::series::{SeriesOptions, build_frame};
use common::{VALID_CONFIG, jobs};
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, mpsc, watch};

struct TestApp {
    app: axum::Router,
    board_tx: watch::Sender<Board>,
    updates_tx: broadcast::Sender<FrameUpdate>,
    command_rx: mpsc::Receiver<PollerCommand>,
}

fn test_app() -> TestApp {
    let config = AppConfig::load_from_str(VALID_CONFIG).unwrap();
    let (board_tx, board_rx) = watch::channel(Board::default());
    let (updates_tx, _) = broadcast::channel(config.publishing.broadcast_capacity);
    let (controls, command_rx) = PollerControls::new(
        NonZeroUsize::new(config.polling.window_size).unwrap(),
        NonZeroU64::new(config.polling.cluster_seconds_since).unwrap(),
    );
    let app = routes::app(
        board_rx,
        updates_tx.clone(),
        controls,
        Arc::new(AtomicUsize::new(0)),
        config,
    );
    TestApp {
        app,
        board_tx,
        updates_tx,
        command_rx,
    }
}

fn jobs_frame() -> FrameUpdate {
    let history: History = vec![jobs(&[("j1", 3.0)]), jobs(&[("j1", 2.0), ("j2", 1.0)])]
        .into_iter()
        .collect();
    let options = SeriesOptions {
        window: 4,
        metric: Metric::Remaining,
        filter_all_zero: true,
    };
    FrameUpdate::Chart(build_frame(Category::Jobs, &history, &options, 2))
}

#[tokio::test]
async fn test_root_endpoint() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("clusterwatch is running");
}

#[tokio::test]
async fn test_version_endpoint() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("clusterwatch")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_info_reports_source_and_controls() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    let json: serde_json::Value = server.get("/api/info").await.json();
    assert_eq!(json["source"], "http://master:8083");
    assert_eq!(json["intervalMs"], 1000);
    assert_eq!(json["windowSize"], 60);
    assert_eq!(json["wsClients"], 0);
}

#[tokio::test]
async fn test_chart_is_404_until_published() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    server
        .get("/api/charts/jobs")
        .expect_failure()
        .await
        .assert_status_not_found();

    let FrameUpdate::Chart(frame) = jobs_frame() else {
        unreachable!()
    };
    t.board_tx.send_modify(|board| {
        board.charts.insert(Category::Jobs, frame);
    });

    let response = server.get("/api/charts/jobs").await;
    response.assert_status_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["category"], "jobs");
    assert_eq!(json["metric"], "remaining");
    assert_eq!(json["series"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["series"][0]["points"].as_array().map(Vec::len), Some(4));

    let all: serde_json::Value = server.get("/api/charts").await.json();
    assert!(all.get("jobs").is_some());
    assert!(all.get("nodes").is_none());
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    let response = server.get("/api/charts/pods").expect_failure().await;
    assert!(response.status_code().is_client_error());
}

#[tokio::test]
async fn test_window_size_can_be_changed() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    server
        .put("/api/window")
        .json(&serde_json::json!({ "windowSize": 0 }))
        .expect_failure()
        .await
        .assert_status_bad_request();

    server
        .put("/api/window")
        .json(&serde_json::json!({ "windowSize": 5 }))
        .await
        .assert_status_ok();
    let json: serde_json::Value = server.get("/api/window").await.json();
    assert_eq!(json["windowSize"], 5);
}

#[tokio::test]
async fn test_seconds_since_can_be_changed() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    let json: serde_json::Value = server.get("/api/since").await.json();
    assert_eq!(json["secondsSince"], 3600);

    server
        .put("/api/since")
        .json(&serde_json::json!({ "secondsSince": 0 }))
        .expect_failure()
        .await
        .assert_status_bad_request();
    server
        .put("/api/since")
        .json(&serde_json::json!({ "secondsSince": 600 }))
        .await
        .assert_status_ok();
    let json: serde_json::Value = server.get("/api/since").await.json();
    assert_eq!(json["secondsSince"], 600);
}

#[tokio::test]
async fn test_reset_queues_a_poller_command() {
    let mut t = test_app();
    let server = TestServer::new(t.app).unwrap();
    server
        .post("/api/charts/nodes/reset")
        .await
        .assert_status(StatusCode::ACCEPTED);
    assert_eq!(
        t.command_rx.try_recv().ok(),
        Some(PollerCommand::Reset(Category::Nodes))
    );
}

#[tokio::test]
async fn test_reset_without_poller_is_unavailable() {
    let t = test_app();
    drop(t.command_rx);
    let server = TestServer::new(t.app).unwrap();
    server
        .post("/api/charts/jobs/reset")
        .expect_failure()
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_cluster_is_404_until_published() {
    let t = test_app();
    let server = TestServer::new(t.app).unwrap();
    server
        .get("/api/cluster")
        .expect_failure()
        .await
        .assert_status_not_found();
}

// --- WebSocket tests (require http_transport + ws feature) ---

#[tokio::test]
async fn test_ws_sends_board_then_updates() {
    let t = test_app();
    let server = TestServer::builder().http_transport().build(t.app).unwrap();
    let mut ws = server
        .get_websocket("/ws/charts")
        .await
        .into_websocket()
        .await;

    let welcome: serde_json::Value = serde_json::from_str(&ws.receive_text().await).unwrap();
    assert_eq!(welcome["type"], "board");
    assert!(welcome["board"]["charts"].is_object());

    // The welcome is sent after subscribing, so this update reaches the client.
    t.updates_tx.send(jobs_frame()).unwrap();
    let update: serde_json::Value = serde_json::from_str(&ws.receive_text().await).unwrap();
    assert_eq!(update["type"], "chart");
    assert_eq!(update["category"], "jobs");
    assert_eq!(update["generation"], 2);
}
