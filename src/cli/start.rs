use crate::Result;
use crate::cli::{Target, print_outcome};
use crate::lifecycle::{Orchestrator, PollConfig, WorkerAction};
use crate::probe::OsProbe;

/// Launch a worker and wait until it owns its port
#[derive(Debug, clap::Args)]
#[clap(
    verbatim_doc_comment,
    long_about = "\
Launch a worker and wait until it owns its port

A no-op if the port is already owned by our worker. Refused if the
port is owned by another program. Otherwise the worker is launched
and the port is polled until ownership is observed or the attempt
budget runs out.

Example:
  shaperctl start --index 1
  shaperctl start --path C:\\tools\\worker.exe --port 10801 --args \"--split\""
)]
pub struct Start {
    #[clap(flatten)]
    target: Target,
}

impl Start {
    pub async fn run(&self) -> Result<()> {
        let req = self.target.to_request(WorkerAction::StartAndVerify)?;
        let orch = Orchestrator::new(OsProbe, PollConfig::from_env());
        let outcome = orch.dispatch(&req).await?;
        print_outcome(&outcome);
        if !outcome.result {
            miette::bail!("start failed: {}", outcome.message);
        }
        Ok(())
    }
}
