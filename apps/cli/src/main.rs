//! coursegen CLI: builds the static course catalog data files for a term.
//!
//! Fetches every school/program listing from the catalog API, groups
//! sections into courses, merges GE category tags, and writes
//! `programs.json` / `courses.json` for the frontend.

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
