use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    vitals::VitalsSample,
    webserver::{
        state::AppState,
        utils::{error_response, json_response},
    },
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/vitals", post(save_vitals))
}

/// POST /api/vitals
///
/// 201 with the stored record, 400 for a body that is not a valid sample,
/// 500 when the store fails.
async fn save_vitals(
    State(state): State<Arc<AppState>>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    let Json(value) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, &rejection.body_text()),
    };

    let sample = match VitalsSample::from_json_value(value) {
        Ok(sample) => sample,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let Some(store) = state.store.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Persistence is disabled");
    };

    match store.save(&sample).await {
        Ok(stored) => {
            logger::debug(LogTag::Store, &format!("Stored sample {} via API", stored.id));
            json_response(StatusCode::CREATED, stored)
        }
        Err(e) => {
            logger::error(LogTag::Store, &format!("Failed to save vitals: {}", e));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save vitals")
        }
    }
}
