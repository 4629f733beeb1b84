mod analysis;
mod cli;
mod config;
mod error;
mod history;
mod insights;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting cihealth - CI Pipeline Health Analyzer");
    cli.execute()?;

    Ok(())
}
