//! Core HTTP forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request not claimed by the management routes, narrates it to
//! observers, takes a directory snapshot, and delegates to the dispatch
//! engine. Submodules handle URL composition ([`compose`]), header
//! construction ([`headers`]), concurrent replay ([`dispatch`]), and
//! the response back to the caller ([`relay`]).

pub mod compose;
pub mod dispatch;
pub mod headers;
pub mod relay;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};

use crate::error::DispatchError;
use crate::server::AppState;

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = req_headers
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    tracing::info!(
        correlation_id = %correlation_id,
        client = %addr.ip(),
        method = %method,
        uri = %uri,
        body_bytes = body.len(),
        "request received"
    );
    state
        .hub
        .broadcast(&format!("incoming {method} {uri} ({} bytes)", body.len()));

    let result = match state.directory.list().await {
        Ok(destinations) => {
            dispatch::dispatch(dispatch::DispatchRequest {
                client: &state.http_client,
                hub: &state.hub,
                destinations: &destinations,
                method: &method,
                uri: &uri,
                headers: &req_headers,
                body: &body,
                timeout: state.defaults.replay_timeout(),
                strip_hop_by_hop: state.defaults.strip_hop_by_hop,
                correlation_id: &correlation_id,
            })
            .await
        }
        Err(e) => Err(DispatchError::Directory(e)),
    };

    match result {
        Ok(captured) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                correlation_id = %correlation_id,
                status = captured.status.as_u16(),
                body_bytes = captured.body.len(),
                "relaying default response"
            );
            relay::relay(captured)
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %correlation_id,
                error = %e,
                "dispatch failed"
            );
            (e.status_code(), e.to_string()).into_response()
        }
    }
}
