//! `GET /traffic`: WebSocket observers of the traffic stream.
//!
//! Each connection is registered with the [`Hub`](super::Hub) and split
//! into a writer task (queue → socket, plus periodic pings) and a reader
//! task that discards inbound frames and notices disconnects. Whichever
//! finishes first ends the connection and removes the subscriber.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};

use super::Subscription;
use crate::server::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn traffic_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| serve_observer(socket, state))
}

async fn serve_observer(socket: WebSocket, state: Arc<AppState>) {
    let Subscription { id, mut lines } = state.hub.register();
    tracing::info!(subscriber = id, observers = state.hub.len(), "observer connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                line = lines.recv() => {
                    let Some(line) = line else { break };
                    if let Err(e) = ws_tx.send(Message::Text(line.into())).await {
                        tracing::debug!(subscriber = id, error = %e, "observer write failed");
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    state.hub.remove(id);
    tracing::info!(subscriber = id, "observer disconnected");
}
