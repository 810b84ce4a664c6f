use crate::cmdline;
use crate::error::{OsCallError, ProbeError};
use crate::probe::ProcessHandle;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Mutex;
use sysinfo::ProcessesToUpdate;

pub struct Procs {
    system: Mutex<sysinfo::System>,
}

pub static PROCS: Lazy<Procs> = Lazy::new(Procs::new);

impl Default for Procs {
    fn default() -> Self {
        Self::new()
    }
}

impl Procs {
    pub fn new() -> Self {
        let procs = Self {
            system: Mutex::new(sysinfo::System::new()),
        };
        procs.refresh_processes();
        procs
    }

    fn lock_system(&self) -> std::sync::MutexGuard<'_, sysinfo::System> {
        self.system.lock().unwrap_or_else(|poisoned| {
            warn!("System mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn refresh_processes(&self) {
        self.lock_system()
            .refresh_processes(ProcessesToUpdate::All, true);
    }

    /// Process Matcher: the first process whose command line contains the
    /// serialized port flag and whose executable resolves to `exe_path`.
    ///
    /// `Ok(None)` is not an error; it means the port is busy but not by us,
    /// and the caller classifies the occupant as foreign.
    pub fn find_worker(
        &self,
        port: u16,
        exe_path: &Path,
    ) -> Result<Option<ProcessHandle>, ProbeError> {
        let canonical = exe_path
            .canonicalize()
            .map_err(|source| ProbeError::Canonicalize {
                path: exe_path.to_path_buf(),
                source,
            })?;
        let wanted = normalize_path(&canonical.to_string_lossy());
        let token = cmdline::port_token(port);
        self.refresh_processes();
        let system = self.lock_system();
        for (pid, process) in system.processes() {
            let argv = process.cmd();
            if argv.is_empty() {
                continue;
            }
            let command_line = argv
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            if !command_line.contains(&token) {
                continue;
            }
            let Some(exe) = process.exe() else {
                continue;
            };
            if normalize_path(&exe.to_string_lossy()) == wanted {
                trace!("port {port} is held by pid {pid}: {command_line}");
                return Ok(Some(ProcessHandle {
                    pid: pid.as_u32(),
                    command_line,
                }));
            }
        }
        Ok(None)
    }

    /// Process Terminator. `Ok(false)` when no process with that pid exists,
    /// which is an acceptable outcome for a stop request.
    pub fn terminate(&self, pid: u32) -> Result<bool, OsCallError> {
        if pid == 0 {
            return Err(OsCallError::InvalidParameter);
        }
        self.refresh_processes();
        let system = self.lock_system();
        match system.process(sysinfo::Pid::from_u32(pid)) {
            Some(process) => {
                debug!("terminating pid {pid}");
                if process.kill() {
                    process.wait();
                    Ok(true)
                } else {
                    Err(OsCallError::Other {
                        reason: format!("the OS refused to deliver a kill signal to pid {pid}"),
                    })
                }
            }
            None => Ok(false),
        }
    }
}

/// Lowercased, separator-unified form used for executable path equality.
///
/// Windows `canonicalize` produces verbatim `\\?\C:\...` paths while the
/// process table reports plain `C:\...`; the prefix is stripped so the two
/// compare equal.
fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix(r"\\?\").unwrap_or(path);
    let lower = path.to_lowercase();
    if cfg!(windows) {
        lower.replace('/', "\\")
    } else {
        lower.replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_case_and_separators() {
        if cfg!(windows) {
            assert_eq!(
                normalize_path(r"C:/Tools\Worker.EXE"),
                r"c:\tools\worker.exe"
            );
            assert_eq!(
                normalize_path(r"\\?\C:\Tools\worker.exe"),
                r"c:\tools\worker.exe"
            );
        } else {
            assert_eq!(normalize_path(r"/Tools\Worker"), "/tools/worker");
        }
    }

    #[test]
    fn test_terminate_rejects_pid_zero() {
        let procs = Procs::new();
        assert!(matches!(
            procs.terminate(0),
            Err(OsCallError::InvalidParameter)
        ));
    }

    #[test]
    fn test_terminate_missing_pid_is_not_an_error() {
        let procs = Procs::new();
        // pid near the top of the range is almost certainly unused
        assert_eq!(procs.terminate(u32::MAX - 2).unwrap(), false);
    }
}
