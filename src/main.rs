//! repo-md: clone a repository and flatten it into Markdown
//!
//! Fetches the repository into a temporary directory, keeps source files and
//! small text files, and writes them to a single document.

use anyhow::Result;

mod cli;
mod config;
mod domain;
mod fetch;
mod render;
mod scan;
mod utils;

fn main() -> Result<()> {
    cli::run()
}
