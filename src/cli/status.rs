use crate::Result;
use crate::probe::OsProbe;
use crate::resolver;
use crate::servers::ServersFile;
use crate::state::PortState;
use comfy_table::{Cell, ContentArrangement, Table};

/// Show the resolved state of every configured server
#[derive(Debug, clap::Args)]
#[clap(
    visible_alias = "ls",
    verbatim_doc_comment,
    long_about = "\
Show the resolved state of every configured server

Each profile's port is classified as free, running (owned by a worker
we launched from the configured executable), or foreign (owned by some
other program).

Example:
  shaperctl status

Output:
  #  Port   State    PID    Path
  1  10801  running  4242   C:\\tools\\worker.exe
  2  10802  free            C:\\tools\\worker.exe"
)]
pub struct Status {
    /// Hide the table header row
    #[clap(long)]
    hide_header: bool,
}

impl Status {
    pub async fn run(&self) -> Result<()> {
        let probe = OsProbe;
        let servers = ServersFile::load()?;

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.hide_header && console::user_attended() {
            table.set_header(vec!["#", "Port", "State", "PID", "Path"]);
        }

        for (index, profile) in servers.servers.iter() {
            let state = resolver::resolve(&probe, profile.port, &profile.real_full_path)?;
            let pid = match &state {
                PortState::OwnedByUs(worker) => worker.pid.to_string(),
                _ => String::new(),
            };
            table.add_row(vec![
                Cell::new(index),
                Cell::new(profile.port),
                Cell::new(style_state(&state)),
                Cell::new(pid),
                Cell::new(profile.real_full_path.display()),
            ]);
        }

        if servers.servers.is_empty() {
            println!("no servers configured");
        } else {
            println!("{table}");
        }
        Ok(())
    }
}

fn style_state(state: &PortState) -> String {
    match state {
        PortState::Free => console::style("free").dim().to_string(),
        PortState::OwnedByUs(_) => console::style("running").green().to_string(),
        PortState::OwnedByForeign => console::style("foreign").red().to_string(),
    }
}
