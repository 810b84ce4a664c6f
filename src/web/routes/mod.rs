pub mod check;
pub mod domains;
pub mod index;
pub mod servers;
pub mod worker;

use axum::Json;
use axum::http::StatusCode;
use serde_json::json;

/// JSON error body plus status, for handlers that return `Result`.
pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn bad_request(err: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": true, "message": err.to_string()})),
    )
}

pub(crate) fn internal_error(err: impl ToString) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": true, "message": err.to_string()})),
    )
}
