//! Clone directory lifetime and removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};
use walkdir::WalkDir;

const REMOVE_ATTEMPTS: usize = 5;
const REMOVE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Owns a clone destination and removes it when dropped.
///
/// Call [`CloneDir::cleanup`] to remove it at a well-defined point and observe
/// the outcome; `Drop` is the fallback for early returns and panics.
#[derive(Debug)]
pub struct CloneDir {
    path: PathBuf,
    keep: bool,
    attempted: bool,
    removed: bool,
}

impl CloneDir {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false, attempted: false, removed: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the directory on disk.
    pub fn keep(&mut self) {
        self.keep = true;
    }

    /// Remove the directory now. Returns `true` when it is gone (or kept on request).
    ///
    /// Removal is attempted once per guard; later calls, including `Drop`,
    /// report the first outcome.
    pub fn cleanup(&mut self) -> bool {
        if self.keep {
            debug!("keeping clone directory {}", self.path.display());
            return true;
        }
        if self.attempted {
            return self.removed;
        }
        self.attempted = true;
        match remove_dir_with_retries(&self.path) {
            Ok(()) => {
                self.removed = true;
                debug!("removed clone directory {}", self.path.display());
                true
            }
            Err(err) => {
                error!("could not remove {} after {REMOVE_ATTEMPTS} attempts: {err}", self.path.display());
                false
            }
        }
    }
}

impl Drop for CloneDir {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// `remove_dir_all` with retries, making read-only entries writable between attempts.
///
/// A path that does not exist counts as removed.
pub fn remove_dir_with_retries(path: &Path) -> io::Result<()> {
    let mut last_err = None;
    for attempt in 1..=REMOVE_ATTEMPTS {
        if !path.exists() {
            return Ok(());
        }
        match fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => {
                warn!("attempt {attempt}: could not remove {}: {err}", path.display());
                make_writable(path);
                last_err = Some(err);
                if attempt < REMOVE_ATTEMPTS {
                    thread::sleep(REMOVE_RETRY_DELAY);
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("directory removal failed")))
}

// git marks pack and index files read-only; on Windows that blocks deletion.
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(root: &Path) {
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            if let Err(err) = fs::set_permissions(entry.path(), permissions) {
                debug!("could not make {} writable: {err}", entry.path().display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_counts_as_removed() {
        let temp = TempDir::new().expect("temp dir");
        assert!(remove_dir_with_retries(&temp.path().join("never-created")).is_ok());
    }

    #[test]
    fn removes_read_only_files() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("clone");
        fs::create_dir_all(target.join(".git/objects")).expect("mkdir");
        let pack = target.join(".git/objects/pack-1.pack");
        fs::write(&pack, b"PACK").expect("write pack");
        let mut perms = fs::metadata(&pack).expect("metadata").permissions();
        perms.set_readonly(true);
        fs::set_permissions(&pack, perms).expect("set readonly");

        remove_dir_with_retries(&target).expect("remove");
        assert!(!target.exists());
    }

    #[test]
    fn cleanup_is_idempotent_and_kept_dirs_survive() {
        let temp = TempDir::new().expect("temp dir");
        let target = temp.path().join("clone");
        fs::create_dir_all(&target).expect("mkdir");

        let mut guard = CloneDir::new(target.clone());
        assert!(guard.cleanup());
        assert!(guard.cleanup());
        assert!(!target.exists());

        // A guard that already ran cleanup does not touch the path again.
        fs::create_dir_all(&target).expect("mkdir again");
        assert!(guard.cleanup());
        assert!(target.exists());
        drop(guard);
        assert!(target.exists());

        {
            let mut kept = CloneDir::new(target.clone());
            kept.keep();
        }
        assert!(target.exists());
    }
}
