use axum::{routing::get, Router};
use std::sync::Arc;

use crate::webserver::state::AppState;

pub mod admin;
pub mod device;
pub mod status;
pub mod vitals;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws::ws_upgrade))
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(vitals::routes())
        .merge(device::routes())
        .nest("/admin", admin::routes())
}
