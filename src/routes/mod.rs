// HTTP + WebSocket routes. Handlers only read snapshots from the aggregator.

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::aggregator::Aggregator;
use crate::config::AppConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) config: AppConfig,
}

pub fn app(aggregator: Arc<Aggregator>, config: AppConfig) -> Router {
    let static_dir = config.server.static_dir.clone();
    let state = AppState { aggregator, config };
    let router = Router::new()
        .route("/", get(|| async { crate::version::NAME })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/top", get(http::top_handler)) // GET /top
        .route("/gps", get(http::gps_handler)) // GET /gps
        .route("/frames", get(http::frames_handler)) // GET /frames
        .route("/lastframe", get(http::last_frame_handler)) // GET /lastframe
        .route("/framejpg/{filename}", get(http::frame_jpg_handler)) // GET /framejpg/{filename}
        .route("/ws/top", get(ws::ws_top)); // WS /ws/top

    let router = match static_dir {
        Some(dir) => router.nest_service("/debug", ServeDir::new(dir)),
        None => router,
    };
    router
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
