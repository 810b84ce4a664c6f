use crate::Result;
use crate::cli::{Target, print_outcome};
use crate::lifecycle::{Orchestrator, PollConfig, WorkerAction};
use crate::probe::OsProbe;

/// Classify a port without changing anything
#[derive(Debug, clap::Args)]
#[clap(
    verbatim_doc_comment,
    long_about = "\
Classify a port without changing anything

Reports whether the port is free, owned by our worker (with its pid
and parsed arguments), or owned by another program.

Example:
  shaperctl inspect --index 1
  shaperctl inspect --path C:\\tools\\worker.exe --port 10801"
)]
pub struct Inspect {
    #[clap(flatten)]
    target: Target,
}

impl Inspect {
    pub async fn run(&self) -> Result<()> {
        let req = self.target.to_request(WorkerAction::Inspect)?;
        let orch = Orchestrator::new(OsProbe, PollConfig::from_env());
        let outcome = orch.dispatch(&req).await?;
        print_outcome(&outcome);
        Ok(())
    }
}
