use crate::Result;
use crate::lifecycle::{WorkerAction, WorkerRequest};
use clap::Parser;
use crate::servers::ServersFile;
use std::path::PathBuf;

mod inspect;
mod serve;
mod start;
mod status;
mod stop;

#[derive(Debug, clap::Parser)]
#[clap(name = "shaperctl", version, about = "Local control panel for per-port traffic-shaping workers")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    Serve(serve::Serve),
    Status(status::Status),
    Inspect(inspect::Inspect),
    Start(start::Start),
    Stop(stop::Stop),
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Status(cmd) => cmd.run().await,
        Command::Inspect(cmd) => cmd.run().await,
        Command::Start(cmd) => cmd.run().await,
        Command::Stop(cmd) => cmd.run().await,
    }
}

/// Shared target selector: either a configured profile index or an explicit
/// executable/port pair.
#[derive(Debug, clap::Args)]
pub(crate) struct Target {
    /// Configured server profile to act on (1-8)
    #[clap(short, long, conflicts_with_all = ["path", "port"])]
    index: Option<u8>,
    /// Worker executable path
    #[clap(long, requires = "port")]
    path: Option<PathBuf>,
    /// SOCKS5 port the worker binds
    #[clap(long, requires = "path")]
    port: Option<u16>,
    /// IP the worker should bind (defaults to all interfaces)
    #[clap(long)]
    ip: Option<String>,
    /// Hosts file name to pass via --hosts
    #[clap(long)]
    hosts: Option<String>,
    /// Extra strategy arguments passed to the worker verbatim
    #[clap(long, default_value = "")]
    args: String,
}

impl Target {
    pub(crate) fn to_request(&self, action: WorkerAction) -> Result<WorkerRequest> {
        if let Some(index) = self.index {
            let servers = ServersFile::load()?;
            let profile = servers.get(index)?;
            return Ok(profile.to_request(action));
        }
        match (&self.path, self.port) {
            (Some(path), Some(port)) => Ok(WorkerRequest {
                action,
                real_full_path: path.clone(),
                port,
                arguments: self.args.clone(),
                hosts_file_name: self.hosts.clone(),
                ip_for_run: self.ip.clone().unwrap_or_default(),
            }),
            _ => miette::bail!("specify either --index or --path with --port"),
        }
    }
}

fn print_outcome(outcome: &crate::lifecycle::LifecycleOutcome) {
    let tag = if outcome.result {
        console::style("ok").green()
    } else {
        console::style("failed").red()
    };
    println!("[{tag}] port {}: {}", outcome.port, outcome.message);
    if let Some(state) = &outcome.state {
        println!("state: {state}");
    }
    if let Some(pid) = outcome.pid {
        println!("pid: {pid}");
    }
    if !outcome.arguments.is_empty() {
        println!("arguments: {}", outcome.arguments);
    }
    if outcome.hosts_file_in_use {
        println!("hosts file: in use");
    }
}
