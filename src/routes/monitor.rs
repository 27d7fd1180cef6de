//! # routes::monitor
//!
//! | Method   | Path           | Description                            |
//! |----------|----------------|----------------------------------------|
//! | GET (WS) | `/ws/monitor`  | Real-time stream of [`TradeEvent`]s    |
//! | GET      | `/api/health`  | Counters and brokerage session status  |
//!
//! [`TradeEvent`]: crate::events::TradeEvent

use std::sync::atomic::Ordering;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tracing::{debug, info};

use crate::state::SharedState;

// ─── WebSocket Handler ────────────────────────────────────────────────────────

pub async fn ws_monitor(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let mut rx = state.broadcast_tx.subscribe();
    let (mut sender, mut receiver) = socket.split();

    info!("🔌 Monitor client connected");

    if sender.send(Message::Text(snapshot(&state).await.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(json_str) => {
                        if sender.send(Message::Text(json_str)).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Monitor client lagged, skipped {n} events");
                    }
                    Err(_) => break,
                }
            }

            result = receiver.next() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("🔌 Monitor client disconnected");
}

async fn snapshot(state: &SharedState) -> serde_json::Value {
    json!({
        "event":       "SNAPSHOT",
        "batch_count": state.batch_count.load(Ordering::Relaxed),
        "order_count": state.order_count.load(Ordering::Relaxed),
        "real_money":  state.config.use_real_money,
        "token_expires_at": state.tokens.expires_at().await,
    })
}

// ─── GET /api/health ──────────────────────────────────────────────────────────

pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let expires_at = state.tokens.expires_at().await;

    Json(json!({
        "ok":               true,
        "batch_count":      state.batch_count.load(Ordering::Relaxed),
        "order_count":      state.order_count.load(Ordering::Relaxed),
        "real_money":       state.config.use_real_money,
        "has_session":      expires_at.is_some(),
        "token_expires_at": expires_at,
    }))
}
