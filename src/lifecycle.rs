//! Lifecycle orchestration: drive a desired action against observed port
//! state, then poll until convergence or the attempt budget runs out.
//!
//! Requests are stateless and one-shot. Nothing is cached across poll ticks;
//! every tick is a full resolve, because a terminated pid can be reused by
//! the system within the polling window. "Is the port now free/owned" is
//! treated as ground truth, not pid persistence.

use crate::env;
use crate::error::{ControlError, RequestError};
use crate::probe::SystemProbe;
use crate::resolver;
use crate::state::PortState;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumIs,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkerAction {
    Inspect,
    StartAndVerify,
    StopAndVerify,
}

/// A one-shot request against a single port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub action: WorkerAction,
    pub real_full_path: PathBuf,
    pub port: u16,
    #[serde(default)]
    pub arguments: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file_name: Option<String>,
    #[serde(default)]
    pub ip_for_run: String,
}

impl WorkerRequest {
    /// Validation happens before any OS query.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.port == 0 {
            return Err(RequestError::PortOutOfRange {
                port: self.port as i64,
            });
        }
        if self.real_full_path.as_os_str().is_empty() || !self.real_full_path.is_file() {
            return Err(RequestError::BadPath {
                path: self.real_full_path.clone(),
            });
        }
        if !self.ip_for_run.is_empty() && self.ip_for_run.parse::<IpAddr>().is_err() {
            return Err(RequestError::BadBindIp {
                ip: self.ip_for_run.clone(),
            });
        }
        Ok(())
    }

    fn bind_ip(&self) -> Option<&str> {
        (!self.ip_for_run.is_empty()).then_some(self.ip_for_run.as_str())
    }
}

/// The sole externally visible artifact of a lifecycle request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub action: WorkerAction,
    pub real_full_path: PathBuf,
    pub port: u16,
    pub hosts_file_in_use: bool,
    pub arguments: String,
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub message: String,
}

/// Fixed-interval polling budget for convergence after launch/terminate.
///
/// Passed in explicitly rather than read from module constants so tests can
/// shrink the interval.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

impl PollConfig {
    /// Panel defaults, overridable from the environment.
    pub fn from_env() -> Self {
        Self {
            attempts: *env::SHAPERCTL_POLL_ATTEMPTS,
            interval: Duration::from_millis(*env::SHAPERCTL_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Expected {
    OwnedByUs,
    Free,
}

impl Expected {
    fn matches(&self, state: &PortState) -> bool {
        match self {
            Expected::OwnedByUs => state.is_owned_by_us(),
            Expected::Free => state.is_free(),
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            Expected::OwnedByUs => "owned_by_us",
            Expected::Free => "free",
        }
    }
}

/// The lifecycle state machine.
///
/// Launch and terminate calls are never retried; a failure there surfaces
/// immediately. Retries apply only to the observation of the resulting
/// state, bounded by the poll budget.
pub struct Orchestrator<P: SystemProbe> {
    probe: P,
    poll: PollConfig,
}

impl<P: SystemProbe> Orchestrator<P> {
    pub fn new(probe: P, poll: PollConfig) -> Self {
        Self { probe, poll }
    }

    /// Validate, then run the state machine for the requested action.
    ///
    /// `Err` is reserved for malformed requests and OS faults. Policy
    /// refusals (already running, foreign-owned port) and convergence
    /// timeouts come back as `Ok` with `result: false`.
    pub async fn dispatch(&self, req: &WorkerRequest) -> Result<LifecycleOutcome, ControlError> {
        req.validate()?;
        match req.action {
            WorkerAction::Inspect => {
                let state = self.resolve(req)?;
                Ok(outcome_for_state(req, state))
            }
            WorkerAction::StartAndVerify => self.start_and_verify(req).await,
            WorkerAction::StopAndVerify => self.stop_and_verify(req).await,
        }
    }

    fn resolve(&self, req: &WorkerRequest) -> Result<PortState, ControlError> {
        Ok(resolver::resolve(&self.probe, req.port, &req.real_full_path)?)
    }

    async fn start_and_verify(&self, req: &WorkerRequest) -> Result<LifecycleOutcome, ControlError> {
        match self.resolve(req)? {
            state @ PortState::OwnedByUs(_) => {
                debug!("port {} already owned by us, start is a no-op", req.port);
                let mut outcome = outcome_for_state(req, state);
                outcome.message = "worker is already running".into();
                Ok(outcome)
            }
            PortState::OwnedByForeign => {
                let mut outcome = outcome_for_state(req, PortState::OwnedByForeign);
                outcome.result = false;
                Ok(outcome)
            }
            PortState::Free => {
                let pid = self
                    .probe
                    .spawn_worker(
                        &req.real_full_path,
                        req.bind_ip(),
                        req.port,
                        req.hosts_file_name.as_deref(),
                        &req.arguments,
                    )
                    .map_err(|source| ControlError::Launch { source })?;
                debug!("launched pid {pid}, waiting for port {} ownership", req.port);
                match self.wait_for_state(req, Expected::OwnedByUs).await? {
                    Some(state) => {
                        let mut outcome = outcome_for_state(req, state);
                        outcome.message = "worker started".into();
                        Ok(outcome)
                    }
                    None => Ok(self.timeout_outcome(req, Expected::OwnedByUs)),
                }
            }
        }
    }

    async fn stop_and_verify(&self, req: &WorkerRequest) -> Result<LifecycleOutcome, ControlError> {
        match self.resolve(req)? {
            PortState::Free => {
                debug!("port {} already free, stop is a no-op", req.port);
                let mut outcome = outcome_for_state(req, PortState::Free);
                outcome.message = "port is already free".into();
                Ok(outcome)
            }
            PortState::OwnedByForeign => {
                let mut outcome = outcome_for_state(req, PortState::OwnedByForeign);
                outcome.result = false;
                outcome.message = "cannot stop: port is in use by another program".into();
                Ok(outcome)
            }
            PortState::OwnedByUs(worker) => {
                let existed = self
                    .probe
                    .terminate(worker.pid)
                    .map_err(|source| ControlError::Terminate {
                        pid: worker.pid,
                        source,
                    })?;
                if !existed {
                    debug!("pid {} was already gone before terminate", worker.pid);
                }
                match self.wait_for_state(req, Expected::Free).await? {
                    Some(state) => {
                        let mut outcome = outcome_for_state(req, state);
                        outcome.message = "worker stopped".into();
                        Ok(outcome)
                    }
                    None => Ok(self.timeout_outcome(req, Expected::Free)),
                }
            }
        }
    }

    /// Poll the resolver at a fixed interval until `expected` is observed.
    ///
    /// Each tick is a full resolve; nothing from earlier ticks is trusted.
    /// Returns `Ok(None)` when the budget is exhausted.
    async fn wait_for_state(
        &self,
        req: &WorkerRequest,
        expected: Expected,
    ) -> Result<Option<PortState>, ControlError> {
        for attempt in 1..=self.poll.attempts {
            let state = self.resolve(req)?;
            if expected.matches(&state) {
                debug!("port {} reached {state} on attempt {attempt}", req.port);
                return Ok(Some(state));
            }
            trace!(
                "port {}: {state}, waiting for {} ({attempt}/{})",
                req.port,
                expected.wire_name(),
                self.poll.attempts
            );
            time::sleep(self.poll.interval).await;
        }
        Ok(None)
    }

    fn timeout_outcome(&self, req: &WorkerRequest, expected: Expected) -> LifecycleOutcome {
        warn!(
            "port {} never reached {} within {} attempts",
            req.port,
            expected.wire_name(),
            self.poll.attempts
        );
        LifecycleOutcome {
            action: req.action,
            real_full_path: req.real_full_path.clone(),
            port: req.port,
            hosts_file_in_use: false,
            arguments: String::new(),
            result: false,
            state: None,
            pid: None,
            message: format!(
                "state '{}' was not reached after {} attempts",
                expected.wire_name(),
                self.poll.attempts
            ),
        }
    }
}

fn outcome_for_state(req: &WorkerRequest, state: PortState) -> LifecycleOutcome {
    let mut outcome = LifecycleOutcome {
        action: req.action,
        real_full_path: req.real_full_path.clone(),
        port: req.port,
        hosts_file_in_use: false,
        arguments: String::new(),
        result: true,
        state: Some(state.to_string()),
        pid: None,
        message: String::new(),
    };
    match state {
        PortState::Free => outcome.message = "port is free".into(),
        PortState::OwnedByUs(worker) => {
            outcome.pid = Some(worker.pid);
            outcome.hosts_file_in_use = worker.hosts_file_in_use;
            outcome.arguments = worker.arguments;
            outcome.message = "port is in use by our worker".into();
        }
        PortState::OwnedByForeign => {
            outcome.message = "port is in use by another program".into();
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline;
    use crate::error::{OsCallError, ProbeError};
    use crate::probe::ProcessHandle;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum FakeState {
        Free,
        Ours { pid: u32, command_line: String },
        Foreign,
    }

    /// Scripted probe: each `port_in_use` call advances through the
    /// timeline; the last entry repeats once the script is exhausted.
    #[derive(Default)]
    struct FakeProbe {
        timeline: Mutex<Vec<FakeState>>,
        cursor: AtomicUsize,
        launches: AtomicUsize,
        terminations: Mutex<Vec<u32>>,
        fail_spawn: bool,
        fail_port_query_at: Option<usize>,
    }

    impl FakeProbe {
        fn scripted(timeline: Vec<FakeState>) -> Self {
            Self {
                timeline: Mutex::new(timeline),
                ..Default::default()
            }
        }

        fn current(&self) -> FakeState {
            let idx = self.cursor.load(Ordering::SeqCst).saturating_sub(1);
            let timeline = self.timeline.lock().unwrap();
            timeline[idx.min(timeline.len() - 1)].clone()
        }

        fn resolutions(&self) -> usize {
            self.cursor.load(Ordering::SeqCst)
        }
    }

    impl crate::probe::SystemProbe for FakeProbe {
        fn port_in_use(&self, _port: u16) -> Result<bool, ProbeError> {
            let call = self.cursor.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_port_query_at == Some(call) {
                return Err(ProbeError::PortQuery {
                    reason: "simulated subsystem failure".into(),
                });
            }
            Ok(!matches!(self.current(), FakeState::Free))
        }

        fn find_owning_process(
            &self,
            _port: u16,
            _exe: &Path,
        ) -> Result<Option<ProcessHandle>, ProbeError> {
            match self.current() {
                FakeState::Ours { pid, command_line } => {
                    Ok(Some(ProcessHandle { pid, command_line }))
                }
                _ => Ok(None),
            }
        }

        fn spawn_worker(
            &self,
            _exe: &Path,
            _bind_ip: Option<&str>,
            _port: u16,
            _hosts_file: Option<&str>,
            _extra_args: &str,
        ) -> Result<u32, OsCallError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail_spawn {
                return Err(OsCallError::AccessDenied);
            }
            Ok(4242)
        }

        fn terminate(&self, pid: u32) -> Result<bool, OsCallError> {
            self.terminations.lock().unwrap().push(pid);
            Ok(true)
        }
    }

    struct TestWorker {
        // held so the file outlives the request path checks
        _file: tempfile::NamedTempFile,
        path: PathBuf,
    }

    fn test_worker() -> TestWorker {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        TestWorker { _file: file, path }
    }

    fn request(worker: &TestWorker, action: WorkerAction, port: u16) -> WorkerRequest {
        WorkerRequest {
            action,
            real_full_path: worker.path.clone(),
            port,
            arguments: "--split".into(),
            hosts_file_name: None,
            ip_for_run: String::new(),
        }
    }

    fn ours(worker: &TestWorker, port: u16, pid: u32, args: &str) -> FakeState {
        FakeState::Ours {
            pid,
            command_line: cmdline::build(&worker.path.to_string_lossy(), None, port, None, args),
        }
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            attempts: 5,
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_inspect_free_port() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Free]), fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::Inspect, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.state.as_deref(), Some("free"));
        assert_eq!(outcome.message, "port is free");
    }

    #[tokio::test]
    async fn test_inspect_owned_port_echoes_arguments() {
        let worker = test_worker();
        let probe = FakeProbe::scripted(vec![ours(&worker, 10801, 77, "--split --ttl 4")]);
        let orch = Orchestrator::new(probe, fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::Inspect, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.state.as_deref(), Some("owned_by_us"));
        assert_eq!(outcome.pid, Some(77));
        assert_eq!(outcome.arguments, "--split --ttl 4");
        assert!(!outcome.hosts_file_in_use);
    }

    #[tokio::test]
    async fn test_start_already_running_skips_launcher() {
        let worker = test_worker();
        let probe = FakeProbe::scripted(vec![ours(&worker, 10801, 77, "--split")]);
        let orch = Orchestrator::new(probe, fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.message, "worker is already running");
        assert_eq!(orch.probe.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_foreign_port_skips_launcher() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Foreign]), fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap();
        assert!(!outcome.result);
        assert_eq!(outcome.state.as_deref(), Some("owned_by_foreign"));
        assert_eq!(outcome.message, "port is in use by another program");
        assert_eq!(orch.probe.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_converges_on_second_poll() {
        let worker = test_worker();
        // pre-check Free, poll 1 still Free, poll 2 sees our worker
        let probe = FakeProbe::scripted(vec![
            FakeState::Free,
            FakeState::Free,
            ours(&worker, 10801, 4242, "--split"),
        ]);
        let orch = Orchestrator::new(probe, fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.state.as_deref(), Some("owned_by_us"));
        assert_eq!(outcome.pid, Some(4242));
        assert_eq!(outcome.arguments, "--split");
        assert!(!outcome.hosts_file_in_use);
        assert_eq!(outcome.message, "worker started");
        assert_eq!(orch.probe.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_timeout_exhausts_exact_budget() {
        let worker = test_worker();
        // the OS never reports our worker: simulate a stuck process
        let probe = FakeProbe::scripted(vec![FakeState::Free]);
        let poll = PollConfig {
            attempts: 5,
            interval: Duration::from_secs(1),
        };
        let orch = Orchestrator::new(probe, poll);
        let started = time::Instant::now();
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap();
        assert!(!outcome.result);
        assert!(outcome.state.is_none());
        assert_eq!(
            outcome.message,
            "state 'owned_by_us' was not reached after 5 attempts"
        );
        // one pre-check resolve plus exactly five poll resolves
        assert_eq!(orch.probe.resolutions(), 6);
        assert_eq!(orch.probe.launches.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_start_launch_failure_surfaces_immediately() {
        let worker = test_worker();
        let probe = FakeProbe {
            timeline: Mutex::new(vec![FakeState::Free]),
            fail_spawn: true,
            ..Default::default()
        };
        let orch = Orchestrator::new(probe, fast_poll());
        let err = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Launch { .. }));
        // no polling after a failed launch
        assert_eq!(orch.probe.resolutions(), 1);
    }

    #[tokio::test]
    async fn test_stop_free_port_skips_terminator() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Free]), fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StopAndVerify, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.message, "port is already free");
        assert!(orch.probe.terminations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_foreign_port_is_refused() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Foreign]), fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StopAndVerify, 10801))
            .await
            .unwrap();
        assert!(!outcome.result);
        assert_eq!(
            outcome.message,
            "cannot stop: port is in use by another program"
        );
        assert!(orch.probe.terminations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stop_converges_to_free() {
        let worker = test_worker();
        let probe = FakeProbe::scripted(vec![
            ours(&worker, 10801, 77, "--split"),
            ours(&worker, 10801, 77, "--split"),
            FakeState::Free,
        ]);
        let orch = Orchestrator::new(probe, fast_poll());
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StopAndVerify, 10801))
            .await
            .unwrap();
        assert!(outcome.result);
        assert_eq!(outcome.state.as_deref(), Some("free"));
        assert_eq!(outcome.message, "worker stopped");
        assert_eq!(*orch.probe.terminations.lock().unwrap(), vec![77]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_timeout_exhausts_exact_budget() {
        let worker = test_worker();
        let probe = FakeProbe::scripted(vec![ours(&worker, 10801, 77, "--split")]);
        let poll = PollConfig {
            attempts: 5,
            interval: Duration::from_secs(1),
        };
        let orch = Orchestrator::new(probe, poll);
        let outcome = orch
            .dispatch(&request(&worker, WorkerAction::StopAndVerify, 10801))
            .await
            .unwrap();
        assert!(!outcome.result);
        assert_eq!(
            outcome.message,
            "state 'free' was not reached after 5 attempts"
        );
        assert_eq!(orch.probe.resolutions(), 6);
    }

    #[tokio::test]
    async fn test_probe_error_mid_poll_aborts() {
        let worker = test_worker();
        let probe = FakeProbe {
            timeline: Mutex::new(vec![FakeState::Free]),
            // pre-check succeeds, second resolve blows up
            fail_port_query_at: Some(2),
            ..Default::default()
        };
        let orch = Orchestrator::new(probe, fast_poll());
        let err = orch
            .dispatch(&request(&worker, WorkerAction::StartAndVerify, 10801))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Probe(_)));
    }

    #[tokio::test]
    async fn test_validation_rejects_port_zero() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Free]), fast_poll());
        let mut req = request(&worker, WorkerAction::Inspect, 1);
        req.port = 0;
        let err = orch.dispatch(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::Request(RequestError::PortOutOfRange { .. })
        ));
        // rejected before any OS query
        assert_eq!(orch.probe.resolutions(), 0);
    }

    #[tokio::test]
    async fn test_validation_rejects_missing_worker_file() {
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Free]), fast_poll());
        let req = WorkerRequest {
            action: WorkerAction::Inspect,
            real_full_path: PathBuf::from("/no/such/worker.exe"),
            port: 10801,
            arguments: String::new(),
            hosts_file_name: None,
            ip_for_run: String::new(),
        };
        let err = orch.dispatch(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::Request(RequestError::BadPath { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_bind_ip() {
        let worker = test_worker();
        let orch = Orchestrator::new(FakeProbe::scripted(vec![FakeState::Free]), fast_poll());
        let mut req = request(&worker, WorkerAction::StartAndVerify, 10801);
        req.ip_for_run = "999.0.0.1".into();
        let err = orch.dispatch(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::Request(RequestError::BadBindIp { .. })
        ));
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{
            "action": "start_and_verify",
            "real_full_path": "C:\\tools\\worker.exe",
            "port": 10801,
            "arguments": "--split"
        }"#;
        let req: WorkerRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.action, WorkerAction::StartAndVerify);
        assert_eq!(req.port, 10801);
        assert_eq!(req.arguments, "--split");
        assert!(req.hosts_file_name.is_none());
        assert_eq!(req.ip_for_run, "");
    }

    #[test]
    fn test_request_rejects_unknown_action() {
        let json = r#"{"action": "reboot", "real_full_path": "w", "port": 1}"#;
        assert!(serde_json::from_str::<WorkerRequest>(json).is_err());
    }
}
