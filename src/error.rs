//! Diagnostic error types for the panel, reported via miette.
//!
//! The taxonomy mirrors how outcomes reach the client: request validation
//! errors become HTTP 400, OS query/launch/terminate faults become HTTP 500,
//! and everything else (policy refusals, convergence timeouts) is a normal
//! response with `result: false` and never an error type at all.

use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Malformed or out-of-range request input. Raised before any OS query.
#[derive(Debug, Error, Diagnostic)]
pub enum RequestError {
    #[error("port {port} is out of range")]
    #[diagnostic(
        code(shaperctl::request::port_out_of_range),
        help("port must be an integer between 1 and 65535")
    )]
    PortOutOfRange { port: i64 },

    #[error("worker path {} does not exist or is not a regular file", path.display())]
    #[diagnostic(
        code(shaperctl::request::bad_path),
        help("real_full_path must be the absolute path of an existing worker executable")
    )]
    BadPath { path: PathBuf },

    #[error("'{ip}' is not a valid IP address")]
    #[diagnostic(code(shaperctl::request::bad_bind_ip))]
    BadBindIp { ip: String },

    #[error("server index {index} is out of range")]
    #[diagnostic(
        code(shaperctl::request::bad_server_index),
        help("server profiles are numbered 1 through 8")
    )]
    BadServerIndex { index: u8 },

    #[error("no server profile configured at index {index}")]
    #[diagnostic(
        code(shaperctl::request::unknown_server),
        help("save a profile for this index first (PUT /servers/{index})")
    )]
    UnknownServer { index: u8 },

    #[error("domain '{domain}' is not a valid hostname")]
    #[diagnostic(
        code(shaperctl::request::bad_domain),
        help("domains must look like 'example.com': lowercase labels joined by dots")
    )]
    BadDomain { domain: String },
}

/// A read-only OS query (port table or process table) failed.
#[derive(Debug, Error, Diagnostic)]
pub enum ProbeError {
    #[error("port query failed: {reason}")]
    #[diagnostic(code(shaperctl::probe::port_query))]
    PortQuery { reason: String },

    #[error("process query failed: {reason}")]
    #[diagnostic(code(shaperctl::probe::process_query))]
    ProcessQuery { reason: String },

    #[error("could not resolve worker path {}", path.display())]
    #[diagnostic(
        code(shaperctl::probe::canonicalize),
        help("the configured worker path must point at an existing file")
    )]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result vocabulary for the OS launch and terminate facilities.
///
/// Launch and terminate share this vocabulary; unmapped failures carry the
/// raw OS code verbatim.
#[derive(Debug, Error, Diagnostic)]
pub enum OsCallError {
    #[error("access denied")]
    #[diagnostic(
        code(shaperctl::os::access_denied),
        help("run the panel with administrator rights")
    )]
    AccessDenied,

    #[error("insufficient privilege")]
    #[diagnostic(code(shaperctl::os::insufficient_privilege))]
    InsufficientPrivilege,

    #[error("invalid path")]
    #[diagnostic(code(shaperctl::os::invalid_path))]
    InvalidPath,

    #[error("invalid parameter")]
    #[diagnostic(code(shaperctl::os::invalid_parameter))]
    InvalidParameter,

    #[error("unknown error, code {code}")]
    #[diagnostic(code(shaperctl::os::unknown_code))]
    UnknownCode { code: i32 },

    #[error("{reason}")]
    #[diagnostic(code(shaperctl::os::other))]
    Other { reason: String },
}

impl OsCallError {
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => OsCallError::AccessDenied,
            io::ErrorKind::NotFound => OsCallError::InvalidPath,
            io::ErrorKind::InvalidInput => OsCallError::InvalidParameter,
            _ => match err.raw_os_error() {
                Some(code) => OsCallError::UnknownCode { code },
                None => OsCallError::Other {
                    reason: err.to_string(),
                },
            },
        }
    }
}

/// Anything that aborts a lifecycle action outright.
#[derive(Debug, Error, Diagnostic)]
pub enum ControlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Probe(#[from] ProbeError),

    #[error("failed to start worker: {source}")]
    #[diagnostic(code(shaperctl::control::launch_failed))]
    Launch {
        #[source]
        source: OsCallError,
    },

    #[error("failed to terminate pid {pid}: {source}")]
    #[diagnostic(code(shaperctl::control::terminate_failed))]
    Terminate {
        pid: u32,
        #[source]
        source: OsCallError,
    },
}

/// Errors for the servers/domains flat-file stores.
#[derive(Debug, Error, Diagnostic)]
pub enum FileError {
    #[error("failed to write file: {}", path.display())]
    #[diagnostic(code(shaperctl::file::write_error))]
    WriteError {
        path: PathBuf,
        #[help]
        details: Option<String>,
    },

    #[error("failed to serialize data for file: {}", path.display())]
    #[diagnostic(
        code(shaperctl::file::serialize_error),
        help("this is likely an internal error; please report it")
    )]
    SerializeError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = RequestError::PortOutOfRange { port: 0 };
        assert_eq!(err.to_string(), "port 0 is out of range");

        let err = RequestError::BadBindIp {
            ip: "999.1.1.1".to_string(),
        };
        assert_eq!(err.to_string(), "'999.1.1.1' is not a valid IP address");

        let err = RequestError::BadPath {
            path: PathBuf::from("/no/such/worker.exe"),
        };
        assert!(err.to_string().contains("worker.exe"));
    }

    #[test]
    fn test_os_call_error_from_io() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            OsCallError::from_io(&err),
            OsCallError::AccessDenied
        ));

        let err = io::Error::new(io::ErrorKind::NotFound, "missing");
        assert!(matches!(OsCallError::from_io(&err), OsCallError::InvalidPath));

        let err = io::Error::from_raw_os_error(1337);
        match OsCallError::from_io(&err) {
            OsCallError::UnknownCode { code } => assert_eq!(code, 1337),
            other => panic!("expected UnknownCode, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_code_display() {
        let err = OsCallError::UnknownCode { code: 21 };
        assert_eq!(err.to_string(), "unknown error, code 21");
    }

    #[test]
    fn test_control_error_wraps_launch() {
        let err = ControlError::Launch {
            source: OsCallError::AccessDenied,
        };
        assert_eq!(
            err.to_string(),
            "failed to start worker: access denied"
        );
    }
}
