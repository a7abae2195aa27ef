use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        utils::{error_response, success_response},
    },
};

/// Simple health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatusResponse {
    pub peers: usize,
    pub device_connected: bool,
    pub uptime_seconds: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub peers_evicted: u64,
}

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(relay_status))
}

/// GET /api/health
async fn health_check() -> Response {
    success_response(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/status
async fn relay_status(State(state): State<Arc<AppState>>) -> Response {
    match state.hub.status().await {
        Ok(status) => {
            logger::debug(
                LogTag::Webserver,
                &format!("Status requested: {} peers, {:?}", status.peers, status.metrics),
            );
            success_response(RelayStatusResponse {
                peers: status.peers,
                device_connected: status.device.connected,
                uptime_seconds: state.uptime_seconds(),
                messages_sent: status.metrics.messages_sent,
                messages_dropped: status.metrics.messages_dropped,
                peers_evicted: status.metrics.peers_evicted,
            })
        }
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}
