use serde::Serialize;

/// Parsed identity of a worker of ours found on a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedWorker {
    pub pid: u32,
    pub command_line: String,
    /// Caller's argument string echoed back out of the observed command line.
    pub arguments: String,
    pub hosts_file_in_use: bool,
}

/// Observed state of an inspected port.
///
/// Never persisted, recomputed on every inspection. Query failures travel
/// as `Err(ProbeError)` alongside this enum rather than as a variant.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display, strum::EnumIs)]
#[strum(serialize_all = "snake_case")]
pub enum PortState {
    Free,
    OwnedByUs(OwnedWorker),
    OwnedByForeign,
}
