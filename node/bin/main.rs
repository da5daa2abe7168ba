use clap::Parser;

use sequencer::cli::Cli;
use sequencer::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    Cli::parse().execute().await?;
    Ok(())
}
