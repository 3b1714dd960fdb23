// GET handlers: version, top, gps, frames, last frame, frame jpeg

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::AppState;
use crate::gps_repo::GpsSnapshot;
use crate::version::{NAME, VERSION};

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /top — last host snapshot (null until the first sample) and its stale flag.
pub(super) async fn top_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.aggregator.top())
}

#[derive(Serialize)]
struct GpsResponse {
    metrics: GpsSnapshot,
    stale: bool,
}

/// GET /gps — per-metric minute averages, oldest first.
pub(super) async fn gps_handler(State(state): State<AppState>) -> impl IntoResponse {
    let gps = state.aggregator.gps();
    Json(GpsResponse {
        metrics: gps.snapshot(),
        stale: gps.is_stale(),
    })
}

/// GET /frames — rate and average size published at the last window tick.
pub(super) async fn frames_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.aggregator.frames().stats())
}

/// GET /lastframe — 204 until a frame has been seen.
pub(super) async fn last_frame_handler(State(state): State<AppState>) -> Response {
    match state.aggregator.frames().last_frame() {
        Some(frame) => Json(frame).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// GET /framejpg/{filename} — raw JPEG from the images directory.
pub(super) async fn frame_jpg_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !is_plain_file_name(&filename) {
        return (StatusCode::BAD_REQUEST, "invalid file name").into_response();
    }
    let path = std::path::Path::new(&state.config.watch.images_path).join(&filename);
    match tokio::fs::read(&path).await {
        Ok(data) => ([(header::CONTENT_TYPE, "image/jpeg")], data).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "frame not found").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "frame read failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
