//! File selection
//!
//! Walks a clone and decides, file by file, what goes into the document:
//! allow-listed extensions always, everything else only when it is small
//! enough and looks like text.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::domain::{FileKind, SelectedFile, SelectionStats};
use crate::utils::{extension_of, is_binary_file, normalize_path};

/// Directory pruned at every depth regardless of configuration.
const GIT_DIR: &str = ".git";

/// Why a file was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooLarge,
    Binary,
    ExcludedGlob,
    /// Symlink whose target is not a regular file inside the root
    Symlink,
}

/// Builder-style selector over one directory tree.
pub struct FileSelector {
    root: PathBuf,
    extensions: BTreeSet<String>,
    max_bytes: u64,
    excluded_dirs: Vec<String>,
    exclude_globs: Vec<String>,
    stats: SelectionStats,
}

impl FileSelector {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extensions: crate::domain::default_extensions(),
            max_bytes: crate::domain::Config::default().max_bytes(),
            excluded_dirs: crate::domain::default_excluded_dirs(),
            exclude_globs: Vec::new(),
            stats: SelectionStats::default(),
        }
    }

    pub fn extensions(mut self, extensions: BTreeSet<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.excluded_dirs = dirs;
        self
    }

    pub fn exclude_globs(mut self, globs: Vec<String>) -> Self {
        self.exclude_globs = globs;
        self
    }

    pub fn stats(&self) -> &SelectionStats {
        &self.stats
    }

    /// Walk the tree and return included files in traversal order.
    pub fn select(&mut self) -> Result<Vec<SelectedFile>> {
        let globs = build_globset(&self.exclude_globs)?;
        self.stats = SelectionStats::default();

        let mut selected = Vec::new();
        let mut dirs_pruned = 0usize;
        let root = self.root.clone();
        let canonical_root = fs::canonicalize(&root)
            .with_context(|| format!("failed to resolve {}", root.display()))?;
        let excluded_dirs = self.excluded_dirs.clone();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let prune = is_pruned_dir(entry, &excluded_dirs);
                if prune {
                    debug!("pruning directory {}", entry.path().display());
                    dirs_pruned += 1;
                }
                !prune
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            let file_type = entry.file_type();
            if !file_type.is_file() && !file_type.is_symlink() {
                continue;
            }

            self.stats.files_scanned += 1;
            let relative_path = normalize_path(entry.path(), &root);
            let size_bytes = if file_type.is_symlink() {
                linked_file_size(entry.path(), &canonical_root)
            } else {
                let metadata = entry
                    .metadata()
                    .with_context(|| format!("failed to stat {}", entry.path().display()))?;
                Some(metadata.len())
            };

            let classified = match size_bytes {
                Some(size_bytes) => self
                    .classify(entry.path(), &relative_path, size_bytes, globs.as_ref())
                    .map(|kind| (kind, size_bytes)),
                None => Err(SkipReason::Symlink),
            };

            match classified {
                Ok((kind, size_bytes)) => {
                    match kind {
                        FileKind::Code => self.stats.code_files += 1,
                        FileKind::Other => self.stats.other_files += 1,
                    }
                    self.stats.files_included += 1;
                    self.stats.total_bytes_included += size_bytes;
                    selected.push(SelectedFile {
                        path: entry.path().to_path_buf(),
                        extension: extension_of(entry.path()),
                        relative_path,
                        size_bytes,
                        kind,
                    });
                }
                Err(reason) => {
                    debug!("skipping {relative_path}: {reason:?}");
                    match reason {
                        SkipReason::TooLarge => self.stats.files_skipped_size += 1,
                        SkipReason::Binary => self.stats.files_skipped_binary += 1,
                        SkipReason::ExcludedGlob => self.stats.files_skipped_glob += 1,
                        SkipReason::Symlink => self.stats.files_skipped_symlink += 1,
                    }
                }
            }
        }

        self.stats.dirs_pruned = dirs_pruned;
        Ok(selected)
    }

    fn classify(
        &self,
        path: &Path,
        relative_path: &str,
        size_bytes: u64,
        globs: Option<&GlobSet>,
    ) -> std::result::Result<FileKind, SkipReason> {
        if globs.is_some_and(|g| g.is_match(relative_path)) {
            return Err(SkipReason::ExcludedGlob);
        }
        if self.is_code_file(path) {
            return Ok(FileKind::Code);
        }
        if size_bytes > self.max_bytes {
            return Err(SkipReason::TooLarge);
        }
        match is_binary_file(path) {
            Ok(false) => Ok(FileKind::Other),
            Ok(true) => Err(SkipReason::Binary),
            Err(err) => {
                warn!("could not inspect {}: {err}", path.display());
                Err(SkipReason::Binary)
            }
        }
    }

    fn is_code_file(&self, path: &Path) -> bool {
        let ext = extension_of(path);
        !ext.is_empty() && self.extensions.contains(&ext)
    }
}

/// Size of a symlink's target when it is a regular file inside `root`.
///
/// Links that dangle, point at directories, or leave the tree yield `None`.
fn linked_file_size(link: &Path, root: &Path) -> Option<u64> {
    let target = fs::canonicalize(link).ok()?;
    if !target.starts_with(root) {
        return None;
    }
    let metadata = fs::metadata(&target).ok()?;
    metadata.is_file().then(|| metadata.len())
}

/// `.git` at any depth, configured names only directly under the root.
fn is_pruned_dir(entry: &DirEntry, excluded_dirs: &[String]) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if name == GIT_DIR {
        return true;
    }
    entry.depth() == 1 && excluded_dirs.iter().any(|d| *d == name)
}

fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("invalid exclude glob '{pattern}'"))?);
    }
    Ok(Some(builder.build()?))
}
