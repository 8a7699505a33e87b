//! Configuration loading
//!
//! Layers defaults, an optional `repo-md.toml` / `repo-md.yml` file, and CLI
//! overrides (see [`merge`]).

mod merge;

pub use merge::{merge_cli_with_config, CliOverrides};

use crate::domain::Config;
use figment::providers::{Format, Serialized, Toml, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Config file names discovered in the working directory, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["repo-md.toml", "repo-md.yml", "repo-md.yaml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported config format for {0} (expected .toml, .yml or .yaml)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid config in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },
}

/// Load configuration, merging an explicit or discovered config file over defaults.
///
/// `explicit` must exist when given. Otherwise the first of
/// [`CONFIG_FILE_NAMES`] found in `anchor` is used, and defaults apply when
/// none is present.
pub fn load_config(anchor: &Path, explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Some(path.to_path_buf())
        }
        None => discover_config(anchor),
    };

    let Some(path) = path else {
        debug!("no config file found in {}, using defaults", anchor.display());
        return Ok(Config::default());
    };

    debug!("loading config from {}", path.display());
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => figment.merge(Toml::file(&path)),
        Some("yml") | Some("yaml") => figment.merge(Yaml::file(&path)),
        _ => return Err(ConfigError::UnsupportedFormat(path)),
    };

    figment.extract().map_err(|source| ConfigError::Invalid { path, source: Box::new(source) })
}

fn discover_config(anchor: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| anchor.join(name)).find(|candidate| candidate.is_file())
}
