//! CourseLens CLI — course catalog enrichment from the terminal.
//!
//! Annotates catalog pages with average GPAs, instructor ratings, and
//! grade-distribution data from the course-data service.

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
