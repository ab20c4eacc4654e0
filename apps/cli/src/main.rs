//! mdpress CLI: combine markdown files into a single printable document.
//!
//! Numbers headings, builds a table of contents and prints a PDF with
//! page-accurate bookmarks through a headless browser.

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
