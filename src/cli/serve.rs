use crate::Result;
use crate::env;

/// Run the control panel HTTP API
#[derive(Debug, clap::Args)]
#[clap(
    verbatim_doc_comment,
    long_about = "\
Run the control panel HTTP API

Binds the JSON API on localhost and serves worker lifecycle,
server profile, domain list, and connectivity check endpoints.

Example:
  shaperctl serve
  shaperctl serve --port 9000"
)]
pub struct Serve {
    /// Port to bind (localhost only)
    #[clap(long)]
    port: Option<u16>,
}

impl Serve {
    pub async fn run(&self) -> Result<()> {
        let port = self.port.unwrap_or(*env::SHAPERCTL_WEB_PORT);
        crate::web::serve(port).await
    }
}
