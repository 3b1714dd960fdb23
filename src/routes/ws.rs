// WebSocket stream of published host snapshots

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::TopState;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub(super) async fn ws_top(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let rx = state.aggregator.subscribe_top();
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_top(socket, rx).await {
            tracing::info!("Top stream error: {}", e);
        }
    })
}

async fn send_json(socket: &mut WebSocket, state: &TopState) -> anyhow::Result<bool> {
    let json = serde_json::to_string(state)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

/// Sends the current state on connect, then every newly published one.
async fn stream_top(mut socket: WebSocket, mut rx: watch::Receiver<TopState>) -> anyhow::Result<()> {
    tracing::info!("Client connected to top stream");
    let current = *rx.borrow_and_update();
    if !send_json(&mut socket, &current).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(WS_PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *rx.borrow_and_update();
                if !send_json(&mut socket, &state).await? {
                    break;
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
        }
    }
    Ok(())
}
