use super::{ApiError, bad_request, internal_error};
use crate::checker::{CheckOutcome, CheckRequest, run_check};
use axum::Json;
use axum::extract::rejection::JsonRejection;

pub async fn check(
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckOutcome>, ApiError> {
    let Json(req) = payload.map_err(bad_request)?;
    // out-of-range knobs are the client's fault; anything past validation
    // (client construction, transport setup) is ours
    req.validate().map_err(bad_request)?;
    debug!(
        "checking {} via socks5://{}:{}",
        req.link, req.socks5_server_ip, req.socks5_server_port
    );
    let outcome = run_check(&req).await.map_err(internal_error)?;
    Ok(Json(outcome))
}
