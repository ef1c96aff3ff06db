//! Entrypoint for CLI

use clap::Parser;
mod cli;
mod commands;
mod manifest;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()?;
    Ok(())
}
