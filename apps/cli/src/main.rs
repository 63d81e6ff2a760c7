//! contribsync CLI: per-user contribution metadata sync from Notion.
//!
//! Reads contribution pages from a Notion database and keeps one
//! `{user_id}.json` metadata document per contributor up to date.

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
