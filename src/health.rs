//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, a summary of the destination directory, the number
//! of connected observers, and cumulative request statistics. A failing
//! directory turns the status into `degraded` (still `200`, so the
//! gateway itself is not restarted for a backend outage).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub directory: DirectoryHealth,
    pub observers: usize,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct DirectoryHealth {
    pub source: String,
    pub destinations: usize,
    pub active: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let source = state.directory.name().to_string();
    let (status, directory) = match state.directory.list().await {
        Ok(destinations) => (
            "healthy",
            DirectoryHealth {
                source,
                destinations: destinations.len(),
                active: destinations.iter().filter(|d| d.is_active).count(),
                default: destinations
                    .iter()
                    .find(|d| d.is_default)
                    .map(|d| d.url.clone()),
                error: None,
            },
        ),
        Err(e) => (
            "degraded",
            DirectoryHealth {
                source,
                destinations: 0,
                active: 0,
                default: None,
                error: Some(e.to_string()),
            },
        ),
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        directory,
        observers: state.hub.len(),
        stats: StatsResponse {
            requests_forwarded: state.stats.forwarded.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    })
}
