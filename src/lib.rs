//! repo-md: flatten a repository into one Markdown document
//!
//! This library clones a repository, selects the files worth reading
//! (source by extension, other text by size), and concatenates them into a
//! single document suited to LLM prompting.

pub mod cli;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod render;
pub mod scan;
pub mod utils;
