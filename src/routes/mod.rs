// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::models::FrameUpdate;
use crate::poller::{Board, PollerControls};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) board_rx: watch::Receiver<Board>,
    pub(crate) updates_tx: broadcast::Sender<FrameUpdate>,
    pub(crate) controls: PollerControls,
    pub(crate) ws_connections: Arc<AtomicUsize>,
    pub(crate) config: AppConfig,
}

pub fn app(
    board_rx: watch::Receiver<Board>,
    updates_tx: broadcast::Sender<FrameUpdate>,
    controls: PollerControls,
    ws_connections: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        board_rx,
        updates_tx,
        controls,
        ws_connections,
        config,
    };
    Router::new()
        .route("/", get(|| async { "clusterwatch is running" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/info", get(http::api_info_handler)) // GET /api/info
        .route("/api/charts", get(http::charts_handler)) // GET /api/charts
        .route("/api/charts/{category}", get(http::chart_handler)) // GET /api/charts/jobs
        .route("/api/charts/{category}/reset", post(http::reset_handler)) // POST /api/charts/jobs/reset
        .route("/api/cluster", get(http::cluster_handler)) // GET /api/cluster
        .route(
            "/api/window",
            get(http::get_window_handler).put(http::put_window_handler),
        ) // GET|PUT /api/window
        .route(
            "/api/since",
            get(http::get_since_handler).put(http::put_since_handler),
        ) // GET|PUT /api/since
        .route("/ws/charts", get(ws::ws_charts)) // WS /ws/charts
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
