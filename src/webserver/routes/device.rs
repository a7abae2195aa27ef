use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::webserver::{
    state::AppState,
    utils::{error_response, success_response},
};

#[derive(Debug, Serialize)]
pub struct DeviceStatusResponse {
    pub connected: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/device/status", get(device_status))
}

/// GET /api/device/status
async fn device_status(State(state): State<Arc<AppState>>) -> Response {
    match state.hub.status().await {
        Ok(status) => success_response(DeviceStatusResponse {
            connected: status.device.connected,
        }),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}
