use crate::error::ProbeError;

/// Port Inspector: a port counts as in use when some process holds a
/// listening TCP socket on it.
///
/// Read-only; a failed query is an error outcome, never a panic.
pub fn port_in_use(port: u16) -> Result<bool, ProbeError> {
    let sockets = listeners::get_all().map_err(|e| ProbeError::PortQuery {
        reason: e.to_string(),
    })?;
    Ok(sockets.iter().any(|l| l.socket.port() == port))
}
