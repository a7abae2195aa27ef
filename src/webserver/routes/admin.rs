use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    webserver::{state::AppState, utils::error_response},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/vitals/download", get(download_vitals))
}

/// Attachment name for a download made today, e.g. `vitals-20260301.json`
pub fn download_filename(now: chrono::DateTime<Utc>) -> String {
    format!("vitals-{}.json", now.format("%Y%m%d"))
}

/// GET /api/admin/vitals/download
async fn download_vitals(State(state): State<Arc<AppState>>) -> Response {
    let Some(store) = state.store.as_ref() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Persistence is disabled");
    };

    let records = match store.history().await {
        Ok(records) => records,
        Err(e) => {
            logger::error(LogTag::Store, &format!("Failed to load vitals: {}", e));
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load vitals");
        }
    };

    let body = match serde_json::to_string_pretty(&records) {
        Ok(body) => body,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    };

    let disposition = format!("attachment; filename=\"{}\"", download_filename(Utc::now()));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_filename() {
        let now = "2026-03-01T23:59:00Z".parse().unwrap();
        assert_eq!(download_filename(now), "vitals-20260301.json");
    }
}
