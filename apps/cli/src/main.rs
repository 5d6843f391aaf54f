//! press CLI: aggregate public activity about named subjects into a static site.
//!
//! Collects feed entries, encyclopedia summaries, and summarized links per
//! subject, stores them, and renders one article page per subject.

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
