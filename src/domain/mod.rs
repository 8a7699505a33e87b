//! Core domain types and models
//!
//! Defines the run configuration, the repository source, and the records the
//! selector and renderer pass between each other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::fetch::FetchError;

/// Current report schema version
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Bytes per megabyte used by the `max_mb` threshold.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Whether a file was selected for its extension or for being small text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Extension is on the allow-list; included regardless of size
    Code,
    /// Anything else that passed the size and binary checks
    Other,
}

/// A file chosen by the selector, in traversal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFile {
    /// Absolute path inside the clone
    pub path: PathBuf,

    /// Path relative to the clone root, `/`-separated
    pub relative_path: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// File extension (lowercase, with leading dot; empty when none)
    pub extension: String,

    pub kind: FileKind,
}

/// A selected file together with its text, alive only while it is rendered.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub relative_path: String,
    pub size_bytes: u64,
    pub extension: String,
    /// Decoded text, or the read error message
    pub content: Result<String, String>,
}

/// Statistics from selection and rendering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionStats {
    /// Total files visited (including filtered)
    pub files_scanned: usize,

    /// Files included in output
    pub files_included: usize,

    /// Included files matched by extension
    pub code_files: usize,

    /// Included files admitted by the size threshold
    pub other_files: usize,

    /// Non-code files over the size threshold
    #[serde(default)]
    pub files_skipped_size: usize,

    /// Non-code files that looked binary
    #[serde(default)]
    pub files_skipped_binary: usize,

    /// Files matching an exclude glob
    #[serde(default)]
    pub files_skipped_glob: usize,

    /// Symlinks that dangle or point outside the tree
    #[serde(default)]
    pub files_skipped_symlink: usize,

    /// Directories pruned from the walk
    #[serde(default)]
    pub dirs_pruned: usize,

    /// Total bytes of included files
    pub total_bytes_included: u64,

    /// Files whose content could not be read at render time
    #[serde(default)]
    pub files_unreadable: usize,

    /// Processing time in seconds
    #[serde(default)]
    pub processing_time_seconds: f64,
}

impl SelectionStats {
    pub fn files_skipped(&self) -> usize {
        self.files_skipped_size
            + self.files_skipped_binary
            + self.files_skipped_glob
            + self.files_skipped_symlink
    }
}

/// A validated repository location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoSource {
    url: String,
}

impl RepoSource {
    /// Validate `raw` as something the clone backend can fetch.
    ///
    /// Accepts `http(s)://`, `ssh://`, `git://`, `file://` URLs, scp-like
    /// `[user@]host:path`, and paths to existing local directories.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let url = raw.trim();
        let invalid = |reason: &str| FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        if url.is_empty() {
            return Err(invalid("empty repository URL"));
        }
        if url.chars().any(char::is_whitespace) {
            return Err(invalid("URL contains whitespace"));
        }

        if let Some((scheme, rest)) = url.split_once("://") {
            let scheme = scheme.to_ascii_lowercase();
            if !matches!(scheme.as_str(), "http" | "https" | "ssh" | "git" | "file") {
                return Err(invalid(&format!("unsupported scheme '{scheme}'")));
            }
            let path_part = if scheme == "file" {
                rest
            } else {
                let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
                if host.is_empty() {
                    return Err(invalid("missing host"));
                }
                path
            };
            if path_part.trim_matches('/').is_empty() {
                return Err(invalid("missing repository path"));
            }
            return Ok(Self { url: url.to_string() });
        }

        if is_scp_like(url) || Path::new(url).is_dir() {
            return Ok(Self { url: url.to_string() });
        }

        Err(invalid("expected a git URL (https://, ssh://, [user@]host:path) or an existing directory"))
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Last path segment without a trailing `.git`, e.g. `repo` for
    /// `https://github.com/org/repo.git`.
    pub fn name(&self) -> String {
        let trimmed = self.url.trim_end_matches('/');
        let last = trimmed.rsplit(['/', ':', '\\']).next().unwrap_or(trimmed);
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            "repo".to_string()
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// scp-like `[user@]host:path` address, e.g. `git@github.com:org/repo.git` or
/// an ssh config alias such as `work:org/repo`.
///
/// Like git, a slash before the first colon makes it a local path.
fn is_scp_like(url: &str) -> bool {
    let Some((host_part, path)) = url.split_once(':') else {
        return false;
    };
    // Windows drive letters (`C:\repo`, `C:/repo`) are not hosts.
    if host_part.len() < 2 || path.is_empty() || path.starts_with('\\') {
        return false;
    }
    let host = host_part.rsplit('@').next().unwrap_or(host_part);
    !host.is_empty() && !host_part.contains(['/', '\\'])
}

/// Custom deserializer for extensions: normalizes to lowercase dot-prefixed format.
///
/// Accepts a comma-separated string or an array of strings; adds the leading
/// dot if missing and strips whitespace.
fn deserialize_extensions<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct ExtensionsVisitor;

    impl<'de> Visitor<'de> for ExtensionsVisitor {
        type Value = BTreeSet<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or array of extensions")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(normalize_extensions(value.split(',')))
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut raw = Vec::new();
            while let Some(ext) = seq.next_element::<String>()? {
                raw.push(ext);
            }
            Ok(normalize_extensions(raw.iter().map(String::as_str)))
        }
    }

    deserializer.deserialize_any(ExtensionsVisitor)
}

/// Lowercase, trim, and dot-prefix every non-empty extension.
pub fn normalize_extensions<'a, I>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .map(str::trim)
        .filter(|ext| !ext.is_empty() && *ext != ".")
        .map(|ext| {
            let lower = ext.to_lowercase();
            if lower.starts_with('.') {
                lower
            } else {
                format!(".{lower}")
            }
        })
        .collect()
}

/// Main configuration for repo-md
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Repository to clone
    #[serde(default, alias = "repo")]
    pub repo_url: Option<String>,

    /// Branch to check out instead of the remote HEAD
    #[serde(default)]
    pub branch: Option<String>,

    /// Where the Markdown document is written
    #[serde(default = "default_clean_dir")]
    pub clean_dir: PathBuf,

    /// Clone destination; a fresh temp dir when unset
    #[serde(default)]
    pub clone_dir: Option<PathBuf>,

    /// Size threshold in megabytes for non-code files
    #[serde(default = "default_max_mb")]
    pub max_mb: u64,

    /// Extension allow-list; these files are always included
    #[serde(default = "default_extensions", deserialize_with = "deserialize_extensions")]
    pub extensions: BTreeSet<String>,

    /// Directory names pruned from the walk (`.git` is pruned at any depth,
    /// the rest only at the clone root)
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Globs matched against relative paths; matches are dropped
    #[serde(default)]
    pub exclude_globs: Vec<String>,

    /// File name of the output document inside `clean_dir`
    #[serde(default = "default_output_name")]
    pub output_name: String,

    #[serde(default = "default_true")]
    pub timestamp: bool,

    #[serde(default)]
    pub write_report: bool,

    #[serde(default)]
    pub keep_clone: bool,
}

impl Config {
    pub fn max_bytes(&self) -> u64 {
        self.max_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn output_path(&self) -> PathBuf {
        self.clean_dir.join(&self.output_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_url: None,
            branch: None,
            clean_dir: default_clean_dir(),
            clone_dir: None,
            max_mb: default_max_mb(),
            extensions: default_extensions(),
            excluded_dirs: default_excluded_dirs(),
            exclude_globs: Vec::new(),
            output_name: default_output_name(),
            timestamp: true,
            write_report: false,
            keep_clone: false,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_clean_dir() -> PathBuf {
    PathBuf::from("clean_code")
}

fn default_max_mb() -> u64 {
    10
}

fn default_output_name() -> String {
    "combined_code.md".to_string()
}

pub fn default_extensions() -> BTreeSet<String> {
    normalize_extensions([".py", ".cpp", ".h", ".hpp", ".c", ".js", ".java", ".ts", ".go", ".rs"])
}

pub fn default_excluded_dirs() -> Vec<String> {
    [
        ".git",
        "build",
        "dist",
        "bin",
        "obj",
        "node_modules",
        "venv",
        "__pycache__",
        ".mypy_cache",
        ".env",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Fence language tag for an extension (with leading dot).
///
/// Unknown extensions fall back to the bare extension so editors still get a hint.
pub fn get_language(extension: &str) -> String {
    let ext = extension.to_lowercase();
    let lang = match ext.as_str() {
        ".py" | ".pyi" => "python",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "javascript",
        ".ts" | ".tsx" => "typescript",
        ".go" => "go",
        ".java" => "java",
        ".kt" | ".kts" => "kotlin",
        ".rs" => "rust",
        ".c" | ".h" => "c",
        ".cpp" | ".hpp" | ".cc" | ".cxx" => "cpp",
        ".cs" => "csharp",
        ".rb" => "ruby",
        ".sh" | ".bash" => "bash",
        ".md" => "markdown",
        ".yaml" | ".yml" => "yaml",
        ".toml" => "toml",
        ".json" => "json",
        ".html" => "html",
        ".css" => "css",
        ".sql" => "sql",
        _ => return ext.trim_start_matches('.').to_string(),
    };
    lang.to_string()
}
