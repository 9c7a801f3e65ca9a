//! Sietsemap CLI: a daily map of the restaurants Robert Sietsema writes about.
//!
//! Scans the newsletter feed, geocodes new addresses, renders the map, and
//! commits the result back to the repository.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
