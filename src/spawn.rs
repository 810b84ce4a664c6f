use crate::cmdline;
use crate::error::OsCallError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Process Launcher: spawn a detached, windowless worker and return its pid.
///
/// Fire-and-forget: a successful spawn only proves the process was created,
/// not that it stayed up or bound its port. Confirming that is the
/// orchestrator's job via polling, so the child handle is dropped here and
/// the OS process table stays the single source of truth.
pub fn spawn_worker(
    exe: &Path,
    bind_ip: Option<&str>,
    port: u16,
    hosts_file: Option<&str>,
    extra_args: &str,
) -> Result<u32, OsCallError> {
    if port == 0 {
        return Err(OsCallError::InvalidParameter);
    }
    if exe.as_os_str().is_empty() {
        return Err(OsCallError::InvalidPath);
    }

    let mut cmd = Command::new(exe);
    cmd.arg("--port").arg(port.to_string());
    if let Some(ip) = bind_ip.filter(|ip| !ip.is_empty()) {
        cmd.arg("--ip").arg(ip);
    }
    if let Some(name) = hosts_file {
        cmd.arg("--hosts").arg(name);
    }
    cmd.args(cmdline::split_args(extra_args));
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        // the worker must not pop a console window
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    let child = cmd.spawn().map_err(|e| OsCallError::from_io(&e))?;
    let pid = child.id();
    info!("spawned worker pid {pid} on port {port}");
    Ok(pid)
}
