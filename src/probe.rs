use crate::error::{OsCallError, ProbeError};
use crate::procs::PROCS;
use crate::{ports, spawn};
use std::path::Path;

/// One OS process observed on the inspected port.
///
/// Transient: produced by a single query and consumed immediately, never
/// cached across polls — the underlying OS state can change between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub command_line: String,
}

/// Capability seam over the OS network and process tables.
///
/// The resolver and orchestrator only ever talk to the OS through this
/// trait, so tests can script port/process observations without touching
/// the real system.
pub trait SystemProbe: Send + Sync {
    fn port_in_use(&self, port: u16) -> Result<bool, ProbeError>;

    fn find_owning_process(
        &self,
        port: u16,
        exe: &Path,
    ) -> Result<Option<ProcessHandle>, ProbeError>;

    fn spawn_worker(
        &self,
        exe: &Path,
        bind_ip: Option<&str>,
        port: u16,
        hosts_file: Option<&str>,
        extra_args: &str,
    ) -> Result<u32, OsCallError>;

    fn terminate(&self, pid: u32) -> Result<bool, OsCallError>;
}

/// Production probe backed by the OS socket and process tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProbe;

impl SystemProbe for OsProbe {
    fn port_in_use(&self, port: u16) -> Result<bool, ProbeError> {
        ports::port_in_use(port)
    }

    fn find_owning_process(
        &self,
        port: u16,
        exe: &Path,
    ) -> Result<Option<ProcessHandle>, ProbeError> {
        PROCS.find_worker(port, exe)
    }

    fn spawn_worker(
        &self,
        exe: &Path,
        bind_ip: Option<&str>,
        port: u16,
        hosts_file: Option<&str>,
        extra_args: &str,
    ) -> Result<u32, OsCallError> {
        spawn::spawn_worker(exe, bind_ip, port, hosts_file, extra_args)
    }

    fn terminate(&self, pid: u32) -> Result<bool, OsCallError> {
        PROCS.terminate(pid)
    }
}
