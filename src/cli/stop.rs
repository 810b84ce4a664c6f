use crate::Result;
use crate::cli::{Target, print_outcome};
use crate::lifecycle::{Orchestrator, PollConfig, WorkerAction};
use crate::probe::OsProbe;

/// Terminate our worker and wait until the port is free
#[derive(Debug, clap::Args)]
#[clap(
    verbatim_doc_comment,
    long_about = "\
Terminate our worker and wait until the port is free

A no-op if the port is already free. Refused if the port is owned by
another program, which is never terminated. Otherwise the worker is
killed and the port is polled until it reads as free or the attempt
budget runs out.

Example:
  shaperctl stop --index 1
  shaperctl stop --path C:\\tools\\worker.exe --port 10801"
)]
pub struct Stop {
    #[clap(flatten)]
    target: Target,
}

impl Stop {
    pub async fn run(&self) -> Result<()> {
        let req = self.target.to_request(WorkerAction::StopAndVerify)?;
        let orch = Orchestrator::new(OsProbe, PollConfig::from_env());
        let outcome = orch.dispatch(&req).await?;
        print_outcome(&outcome);
        if !outcome.result {
            miette::bail!("stop failed: {}", outcome.message);
        }
        Ok(())
    }
}
