//! Repository fetching
//!
//! Clones a [`RepoSource`] into a local directory with libgit2 and hands back
//! a [`CloneDir`] guard that owns the clone's lifetime.

mod cleanup;

pub use cleanup::{remove_dir_with_retries, CloneDir};

use crate::domain::RepoSource;
use console::Term;
use git2::build::RepoBuilder;
use git2::{FetchOptions, Progress, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("cannot prepare clone directory {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },
}

/// Reserve the clone destination.
///
/// An explicit directory left over from an earlier run is removed first; with
/// no explicit directory a fresh temp dir is created.
pub fn prepare_clone_dir(explicit: Option<&Path>) -> Result<CloneDir, FetchError> {
    match explicit {
        Some(path) => {
            if path.exists() {
                warn!("removing existing clone directory {}", path.display());
                remove_dir_with_retries(path).map_err(|source| FetchError::Destination {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| FetchError::Destination {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            Ok(CloneDir::new(path.to_path_buf()))
        }
        None => {
            let temp = tempfile::Builder::new().prefix("repo-md-").tempdir().map_err(|source| {
                FetchError::Destination { path: std::env::temp_dir(), source }
            })?;
            // libgit2 refuses to clone into a non-empty directory but accepts an
            // existing empty one; the guard takes over removal from TempDir.
            Ok(CloneDir::new(temp.keep()))
        }
    }
}

/// Clone `source` into `dest`, checking out `branch` when given.
pub fn clone_repository(
    source: &RepoSource,
    dest: &Path,
    branch: Option<&str>,
) -> Result<(), FetchError> {
    info!("cloning {} into {}", source, dest.display());

    let progress = clone_progress_bar();
    let mut callbacks = RemoteCallbacks::new();
    {
        let progress = progress.clone();
        callbacks.transfer_progress(move |stats: Progress<'_>| {
            if let Some(bar) = &progress {
                bar.set_length(stats.total_objects() as u64);
                bar.set_position(stats.received_objects() as u64);
            }
            true
        });
    }

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        debug!("checking out branch {branch}");
        builder.branch(branch);
    }

    let result = builder.clone(source.as_str(), dest);
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    let repo = result.map_err(|source_err| FetchError::Clone {
        url: source.to_string(),
        source: source_err,
    })?;
    if let Ok(head) = repo.head() {
        debug!("checked out {}", head.shorthand().unwrap_or("HEAD"));
    }
    Ok(())
}

fn clone_progress_bar() -> Option<ProgressBar> {
    if !Term::stderr().is_term() {
        return None;
    }
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner} cloning [{bar:30}] {pos}/{len} objects")
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    Some(bar)
}
