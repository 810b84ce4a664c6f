use crate::cmdline;
use crate::error::ProbeError;
use crate::probe::SystemProbe;
use crate::state::{OwnedWorker, PortState};
use std::path::Path;

/// State Resolver: classify a port as free, ours, or foreign.
///
/// Port occupancy alone cannot tell our worker from a stranger bound to the
/// same port, so ownership is established in a second step by cross-checking
/// process identity against the configured executable path.
pub fn resolve<P: SystemProbe>(
    probe: &P,
    port: u16,
    exe: &Path,
) -> Result<PortState, ProbeError> {
    if !probe.port_in_use(port)? {
        return Ok(PortState::Free);
    }
    match probe.find_owning_process(port, exe)? {
        Some(handle) => {
            let parsed = cmdline::parse(&handle.command_line, port);
            Ok(PortState::OwnedByUs(OwnedWorker {
                pid: handle.pid,
                command_line: handle.command_line,
                arguments: parsed.arguments,
                hosts_file_in_use: parsed.hosts_file_in_use,
            }))
        }
        None => Ok(PortState::OwnedByForeign),
    }
}
