//! Flatten command implementation

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::utils::parse_csv;
use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::{normalize_extensions, Config, RepoSource, SelectionStats};
use crate::fetch::{clone_repository, prepare_clone_dir};
use crate::render::{render_document, write_report, DocumentHeader};
use crate::scan::FileSelector;
use crate::utils::format_with_commas;

#[derive(Args)]
pub struct FlattenArgs {
    /// Repository URL (e.g. https://github.com/username/repo.git) or local repository path
    #[arg(value_name = "REPO_URL")]
    pub repo_url: String,

    /// Directory for the combined document [default: clean_code]
    #[arg(long = "clean_dir", visible_alias = "clean-dir", value_name = "DIR")]
    pub clean_dir: Option<PathBuf>,

    /// Clone destination, removed after the run [default: a new temp directory]
    #[arg(long = "clone_dir", visible_alias = "clone-dir", value_name = "DIR")]
    pub clone_dir: Option<PathBuf>,

    /// Max file size (MB) for non-code files [default: 10]
    #[arg(long = "max_mb", visible_alias = "max-mb", value_name = "MB")]
    pub max_mb: Option<u64>,

    /// Comma-separated code extensions, always included (e.g. '.py,.rs')
    #[arg(long, value_name = "EXTS")]
    pub extensions: Option<String>,

    /// Exclude paths matching these globs (comma-separated)
    #[arg(short = 'e', long, value_name = "GLOBS")]
    pub exclude: Option<String>,

    /// Branch to check out instead of the remote default
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Output file name inside the clean directory [default: combined_code.md]
    #[arg(short, long, value_name = "NAME")]
    pub output: Option<String>,

    /// Path to config file (repo-md.toml or repo-md.yml)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Omit the generation timestamp for reproducible output
    #[arg(long)]
    pub no_timestamp: bool,

    /// Also write a JSON report next to the document
    #[arg(long)]
    pub report: bool,

    /// Leave the clone on disk after the run
    #[arg(long = "keep_clone", visible_alias = "keep-clone")]
    pub keep_clone: bool,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct FlattenOutcome {
    pub source: RepoSource,
    pub output_path: PathBuf,
    pub report_path: Option<PathBuf>,
    pub clone_dir: PathBuf,
    /// Whether the clone directory was removed (or kept on request)
    pub clone_cleaned: bool,
    pub stats: SelectionStats,
}

pub fn run(args: FlattenArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let file_config = load_config(&cwd, args.config.as_deref())?;

    let cli_overrides = CliOverrides {
        repo_url: Some(args.repo_url.clone()),
        branch: args.branch.clone(),
        clean_dir: args.clean_dir.clone(),
        clone_dir: args.clone_dir.clone(),
        max_mb: args.max_mb,
        extensions: parse_csv(&args.extensions)
            .map(|exts| normalize_extensions(exts.iter().map(String::as_str))),
        exclude_globs: parse_csv(&args.exclude),
        output_name: args.output.clone(),
        timestamp: if args.no_timestamp { Some(false) } else { None },
        write_report: if args.report { Some(true) } else { None },
        keep_clone: if args.keep_clone { Some(true) } else { None },
    };
    let merged = merge_cli_with_config(file_config, cli_overrides);

    let outcome = flatten_repository(&merged)?;
    print_summary(&outcome);
    Ok(())
}

/// Clone, select, render, and clean up, in that order.
///
/// The clone directory is removed whether or not cloning or rendering
/// succeeded; a failed removal is logged and reported in the outcome.
pub fn flatten_repository(config: &Config) -> Result<FlattenOutcome> {
    let start_time = Instant::now();

    let raw_url = config.repo_url.as_deref().context("a repository URL is required")?;
    let source = RepoSource::parse(raw_url)?;

    if let Some(explicit) = config.clone_dir.as_deref() {
        check_dirs_disjoint(&config.clean_dir, explicit)?;
    }

    let mut clone_dir = prepare_clone_dir(config.clone_dir.as_deref())?;
    if config.keep_clone {
        clone_dir.keep();
    }

    let result = fetch_and_render(&source, config, clone_dir.path(), start_time);
    let clone_cleaned = clone_dir.cleanup();
    if !clone_cleaned {
        warn!("clone directory {} was left behind", clone_dir.path().display());
    }

    let (output_path, report_path, stats) = result?;
    Ok(FlattenOutcome {
        source,
        output_path,
        report_path,
        clone_dir: clone_dir.path().to_path_buf(),
        clone_cleaned,
        stats,
    })
}

fn fetch_and_render(
    source: &RepoSource,
    config: &Config,
    clone_path: &Path,
    start_time: Instant,
) -> Result<(PathBuf, Option<PathBuf>, SelectionStats)> {
    clone_repository(source, clone_path, config.branch.as_deref())?;

    let mut selector = FileSelector::new(clone_path.to_path_buf())
        .extensions(config.extensions.clone())
        .max_bytes(config.max_bytes())
        .excluded_dirs(config.excluded_dirs.clone())
        .exclude_globs(config.exclude_globs.clone());
    let files = selector.select()?;
    let mut stats = selector.stats().clone();
    info!(
        "selected {} of {} files ({} code, {} other)",
        stats.files_included, stats.files_scanned, stats.code_files, stats.other_files
    );

    let generated_at =
        config.timestamp.then(|| Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let header = DocumentHeader { source, generated_at: generated_at.clone() };
    let output_path = config.output_path();
    render_document(&output_path, &header, &files, &mut stats)?;
    info!("wrote {}", output_path.display());

    // Record processing time before writing the report so the value is correct in it.
    stats.processing_time_seconds = start_time.elapsed().as_secs_f64();

    let report_path = if config.write_report {
        let path = report_path_for(&output_path);
        write_report(&path, source, config, &stats, &files, generated_at.as_deref())?;
        Some(path)
    } else {
        None
    };

    Ok((output_path, report_path, stats))
}

/// The clone is reset before cloning and removed afterwards, so an output
/// directory at or below it would be wiped with it.
fn check_dirs_disjoint(clean_dir: &Path, clone_dir: &Path) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let clean = cwd.join(clean_dir);
    let clone = cwd.join(clone_dir);
    if clean.starts_with(&clone) {
        bail!(
            "clean_dir {} must not be the clone directory or inside it ({})",
            clean_dir.display(),
            clone_dir.display()
        );
    }
    Ok(())
}

/// `combined_code.md` -> `combined_code_report.json` in the same directory.
fn report_path_for(output_path: &Path) -> PathBuf {
    let stem = output_path.file_stem().and_then(|s| s.to_str()).unwrap_or("combined");
    output_path.with_file_name(format!("{stem}_report.json"))
}

fn print_summary(outcome: &FlattenOutcome) {
    let stats = &outcome.stats;

    println!();
    println!("Flatten complete!");
    println!();
    println!("Statistics:");
    println!("  Repository:      {}", outcome.source);
    println!("  Files scanned:   {}", stats.files_scanned);
    println!(
        "  Files included:  {} ({} code, {} other)",
        stats.files_included, stats.code_files, stats.other_files
    );

    if stats.files_skipped() > 0 {
        println!("  Files skipped:");
        if stats.files_skipped_size > 0 {
            println!("    size limit:  {}", stats.files_skipped_size);
        }
        if stats.files_skipped_binary > 0 {
            println!("    binary:      {}", stats.files_skipped_binary);
        }
        if stats.files_skipped_glob > 0 {
            println!("    glob:        {}", stats.files_skipped_glob);
        }
        if stats.files_skipped_symlink > 0 {
            println!("    symlink:     {}", stats.files_skipped_symlink);
        }
    }
    if stats.files_unreadable > 0 {
        println!("  Unreadable:      {}", stats.files_unreadable);
    }
    println!("  Total bytes:     {}", format_with_commas(stats.total_bytes_included));
    println!("  Processing time: {:.2}s", stats.processing_time_seconds);

    println!();
    println!("Output files:");
    println!("  {}", outcome.output_path.display());
    if let Some(report) = &outcome.report_path {
        println!("  {}", report.display());
    }
    if !outcome.clone_cleaned {
        println!();
        println!("Warning: could not remove clone directory {}", outcome.clone_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{IndexAddOption, Repository, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn fixture_repo() -> TempDir {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();
        fs::create_dir_all(root.join("src")).expect("mkdir src");
        fs::write(root.join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n").expect("write lib");
        fs::write(root.join("README.md"), "# Fixture\n").expect("write readme");

        let repo = Repository::init(root).expect("init");
        let mut index = repo.index().expect("index");
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).expect("add");
        index.write().expect("write index");
        let tree = repo.find_tree(index.write_tree().expect("tree")).expect("find tree");
        let sig = Signature::now("Fixture", "fixture@example.com").expect("signature");
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).expect("commit");
        temp
    }

    #[test]
    fn report_path_sits_beside_output() {
        assert_eq!(
            report_path_for(Path::new("clean_code/combined_code.md")),
            PathBuf::from("clean_code/combined_code_report.json")
        );
    }

    #[test]
    fn flattens_and_removes_clone() {
        let origin = fixture_repo();
        let work = TempDir::new().expect("temp dir");
        let config = Config {
            repo_url: Some(origin.path().display().to_string()),
            clean_dir: work.path().join("clean"),
            clone_dir: Some(work.path().join("clone")),
            timestamp: false,
            write_report: true,
            ..Config::default()
        };

        let outcome = flatten_repository(&config).expect("flatten");

        assert!(outcome.clone_cleaned);
        assert!(!work.path().join("clone").exists());
        assert_eq!(outcome.stats.files_included, 2);
        let doc = fs::read_to_string(&outcome.output_path).expect("read doc");
        assert!(doc.contains("### `README.md`"));
        assert!(doc.contains("### `src/lib.rs`"));
        assert!(!doc.contains("Generated:"));
        assert!(outcome.report_path.expect("report").is_file());
    }

    #[test]
    fn clone_failure_still_cleans_up() {
        let work = TempDir::new().expect("temp dir");
        let config = Config {
            repo_url: Some(format!("file://{}", work.path().join("missing.git").display())),
            clean_dir: work.path().join("clean"),
            clone_dir: Some(work.path().join("clone")),
            ..Config::default()
        };

        assert!(flatten_repository(&config).is_err());
        assert!(!work.path().join("clone").exists());
        assert!(!work.path().join("clean").exists());
    }

    #[test]
    fn temp_clone_dir_is_used_and_removed() {
        let origin = fixture_repo();
        let work = TempDir::new().expect("temp dir");
        let config = Config {
            repo_url: Some(origin.path().display().to_string()),
            clean_dir: work.path().join("clean"),
            clone_dir: None,
            timestamp: false,
            ..Config::default()
        };

        let outcome = flatten_repository(&config).expect("flatten");

        assert!(outcome.clone_cleaned);
        assert!(!outcome.clone_dir.exists());
        assert!(outcome.clone_dir.starts_with(std::env::temp_dir()));
        let name = outcome.clone_dir.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("repo-md-"));
        assert_eq!(outcome.stats.files_included, 2);
    }

    #[test]
    fn clean_dir_inside_clone_dir_is_rejected() {
        let origin = fixture_repo();
        let work = TempDir::new().expect("temp dir");
        let clone = work.path().join("clone");

        for clean in [clone.clone(), clone.join("out")] {
            let config = Config {
                repo_url: Some(origin.path().display().to_string()),
                clean_dir: clean.clone(),
                clone_dir: Some(clone.clone()),
                ..Config::default()
            };
            let err = flatten_repository(&config).expect_err("overlapping dirs");
            assert!(err.to_string().contains("must not be the clone directory"));
            assert!(!clone.exists());
            assert!(!clean.exists());
        }

        // A sibling that merely shares a name prefix is fine.
        let config = Config {
            repo_url: Some(origin.path().display().to_string()),
            clean_dir: work.path().join("clone_out"),
            clone_dir: Some(clone.clone()),
            timestamp: false,
            ..Config::default()
        };
        flatten_repository(&config).expect("sibling dirs");
        assert!(work.path().join("clone_out/combined_code.md").is_file());
    }

    #[test]
    fn invalid_url_fails_before_touching_disk() {
        let work = TempDir::new().expect("temp dir");
        let config = Config {
            repo_url: Some("ftp://example.com/repo".to_string()),
            clone_dir: Some(work.path().join("clone")),
            ..Config::default()
        };

        let err = flatten_repository(&config).expect_err("invalid url");
        assert!(err.to_string().contains("invalid repository URL"));
        assert!(!work.path().join("clone").exists());
    }
}
