use super::{ApiError, bad_request, internal_error};
use crate::error::ControlError;
use crate::lifecycle::{LifecycleOutcome, Orchestrator, PollConfig, WorkerRequest};
use crate::probe::OsProbe;
use axum::Json;
use axum::extract::rejection::JsonRejection;

/// The lifecycle endpoint. Policy refusals and convergence timeouts come
/// back as 200 with `result: false`; only malformed requests (400) and OS
/// faults (500) get error statuses. Bodies the serde layer rejects (unknown
/// action, out-of-range port, wrong types) are malformed requests too and
/// get the same error shape.
pub async fn dispatch(
    payload: Result<Json<WorkerRequest>, JsonRejection>,
) -> Result<Json<LifecycleOutcome>, ApiError> {
    let Json(req) = payload.map_err(bad_request)?;
    info!("{} port {} ({})", req.action, req.port, req.real_full_path.display());
    let orch = Orchestrator::new(OsProbe, PollConfig::from_env());
    match orch.dispatch(&req).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ControlError::Request(e)) => Err(bad_request(e)),
        Err(e) => {
            error!("{} port {} failed: {e}", req.action, req.port);
            Err(internal_error(e))
        }
    }
}
