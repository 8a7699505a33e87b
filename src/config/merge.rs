//! CLI argument merging with config

use crate::domain::Config;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub clean_dir: Option<PathBuf>,
    pub clone_dir: Option<PathBuf>,
    pub max_mb: Option<u64>,
    pub extensions: Option<BTreeSet<String>>,
    pub exclude_globs: Option<Vec<String>>,
    pub output_name: Option<String>,
    pub timestamp: Option<bool>,
    pub write_report: Option<bool>,
    pub keep_clone: Option<bool>,
}

pub fn merge_cli_with_config(mut base_config: Config, cli: CliOverrides) -> Config {
    if let Some(repo_url) = cli.repo_url {
        base_config.repo_url = Some(repo_url);
    }
    if let Some(branch) = cli.branch {
        base_config.branch = Some(branch);
    }

    if let Some(clean_dir) = cli.clean_dir {
        base_config.clean_dir = clean_dir;
    }
    if let Some(clone_dir) = cli.clone_dir {
        base_config.clone_dir = Some(clone_dir);
    }

    if let Some(max_mb) = cli.max_mb {
        base_config.max_mb = max_mb;
    }
    if let Some(extensions) = cli.extensions {
        base_config.extensions = extensions;
    }
    if let Some(exclude_globs) = cli.exclude_globs {
        base_config.exclude_globs.extend(exclude_globs);
    }

    if let Some(output_name) = cli.output_name {
        base_config.output_name = output_name;
    }
    if let Some(timestamp) = cli.timestamp {
        base_config.timestamp = timestamp;
    }
    if let Some(write_report) = cli.write_report {
        base_config.write_report = write_report;
    }
    if let Some(keep_clone) = cli.keep_clone {
        base_config.keep_clone = keep_clone;
    }

    base_config
}
