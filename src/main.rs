use shaperctl::{Result, cli, logger};

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    cli::run().await
}
