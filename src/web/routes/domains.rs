use super::{ApiError, bad_request, internal_error};
use crate::domains;
use crate::servers::validate_index;
use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SaveDomains {
    pub domains: Vec<String>,
}

pub async fn save(
    Path(index): Path<u8>,
    payload: Result<Json<SaveDomains>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(body) = payload.map_err(bad_request)?;
    // validate first so malformed input maps to 400, not 500
    validate_index(index).map_err(bad_request)?;
    let normalized = domains::normalize_domains(&body.domains).map_err(bad_request)?;
    let count = domains::save_domains(index, &normalized).map_err(internal_error)?;
    Ok(Json(json!({"result": true, "count": count})))
}

pub async fn load(Path(index): Path<u8>) -> Result<Json<serde_json::Value>, ApiError> {
    validate_index(index).map_err(bad_request)?;
    let domains = domains::load_domains(index).map_err(internal_error)?;
    Ok(Json(json!({"result": true, "domains": domains})))
}
