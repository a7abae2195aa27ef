/// Response helpers shared by the API routes
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// 200 with a JSON body
pub fn success_response<T: Serialize>(data: T) -> Response {
    Json(data).into_response()
}

/// Any status with a JSON body
pub fn json_response<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(data)).into_response()
}

/// Error status with `{ "error": message }`
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
