//! Command-line interface for repo-md
//!
//! One command: clone `REPO_URL`, select files, write the combined document.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod flatten;
mod utils;

pub use flatten::{flatten_repository, FlattenOutcome};

/// Clone a repository and flatten its source into one Markdown document
#[derive(Parser)]
#[command(name = "repo-md")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    args: flatten::FlattenArgs,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    verbose: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    flatten::run(cli.args)
}
