use clap::Parser;

use tbears_block_manager::cli::Cli;
use tbears_block_manager::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    Cli::parse().execute().await?;
    Ok(())
}
