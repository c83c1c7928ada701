// GET/PUT/POST handlers: version, info, chart frames, window + since controls, manual refresh

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::num::{NonZeroU64, NonZeroUsize};
use std::sync::atomic::Ordering;

use super::AppState;
use crate::error::ApiError;
use crate::models::{Category, ChartFrame, ClusterFrame};

/// Package name and version (from Cargo.toml at build time).
pub(super) const NAME: &str = env!("CARGO_PKG_NAME");
pub(super) const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WindowBody {
    pub window_size: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SinceBody {
    pub seconds_since: u64,
}

/// GET /version
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/info: where we poll, how often, and the current controls.
pub(super) async fn api_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "source": state.config.source.base_url,
        "intervalMs": state.config.polling.interval_ms,
        "windowSize": state.controls.window(),
        "secondsSince": state.controls.seconds_since(),
        "clusterEnabled": state.config.polling.cluster_enabled,
        "wsClients": state.ws_connections.load(Ordering::Relaxed),
    }))
}

/// GET /api/charts: latest frame per category (categories with no data yet are absent).
pub(super) async fn charts_handler(State(state): State<AppState>) -> impl IntoResponse {
    let charts = state.board_rx.borrow().charts.clone();
    Json(charts)
}

/// GET /api/charts/{category}
pub(super) async fn chart_handler(
    State(state): State<AppState>,
    Path(category): Path<Category>,
) -> Result<Json<ChartFrame>, ApiError> {
    let board = state.board_rx.borrow();
    board
        .charts
        .get(&category)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no {} chart published yet", category)))
}

/// POST /api/charts/{category}/reset: clear history and refetch.
pub(super) async fn reset_handler(
    State(state): State<AppState>,
    Path(category): Path<Category>,
) -> Result<StatusCode, ApiError> {
    state.controls.reset(category)?;
    Ok(StatusCode::ACCEPTED)
}

/// GET /api/cluster
pub(super) async fn cluster_handler(
    State(state): State<AppState>,
) -> Result<Json<ClusterFrame>, ApiError> {
    let board = state.board_rx.borrow();
    board
        .cluster
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no cluster stats published yet".into()))
}

/// GET /api/window
pub(super) async fn get_window_handler(State(state): State<AppState>) -> Json<WindowBody> {
    Json(WindowBody {
        window_size: state.controls.window(),
    })
}

/// PUT /api/window: takes effect at the next applied poll.
pub(super) async fn put_window_handler(
    State(state): State<AppState>,
    Json(body): Json<WindowBody>,
) -> Result<Json<WindowBody>, ApiError> {
    let window = NonZeroUsize::new(body.window_size)
        .ok_or_else(|| ApiError::BadRequest("windowSize must be at least 1".into()))?;
    state.controls.set_window(window);
    tracing::info!(window_size = window.get(), "Window size updated");
    Ok(Json(body))
}

/// GET /api/since
pub(super) async fn get_since_handler(State(state): State<AppState>) -> Json<SinceBody> {
    Json(SinceBody {
        seconds_since: state.controls.seconds_since(),
    })
}

/// PUT /api/since: used by the next cluster fetch.
pub(super) async fn put_since_handler(
    State(state): State<AppState>,
    Json(body): Json<SinceBody>,
) -> Result<Json<SinceBody>, ApiError> {
    let seconds = NonZeroU64::new(body.seconds_since)
        .ok_or_else(|| ApiError::BadRequest("secondsSince must be at least 1".into()))?;
    state.controls.set_seconds_since(seconds);
    tracing::info!(seconds_since = seconds.get(), "Cluster window updated");
    Ok(Json(body))
}
