//! comparekit CLI: catalog enrichment for comparison sites.
//!
//! Reads a raw product table, asks a text generation service for pros,
//! cons, a verdict and a rating in three languages, and keeps an enriched
//! table up to date one entry at a time.

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
