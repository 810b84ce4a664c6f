use super::{ApiError, bad_request, internal_error};
use crate::servers::{ServerProfile, ServersFile};
use axum::Json;
use axum::extract::Path;
use axum::extract::rejection::JsonRejection;
use indexmap::IndexMap;
use serde_json::json;

pub async fn list() -> Result<Json<IndexMap<u8, ServerProfile>>, ApiError> {
    let file = ServersFile::load().map_err(internal_error)?;
    Ok(Json(file.servers))
}

pub async fn set(
    Path(index): Path<u8>,
    payload: Result<Json<ServerProfile>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(profile) = payload.map_err(bad_request)?;
    let mut file = ServersFile::load().map_err(internal_error)?;
    file.set(index, profile).map_err(bad_request)?;
    file.write().map_err(internal_error)?;
    info!("saved server profile {index}");
    Ok(Json(json!({"result": true})))
}
