//! JSON run report

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::domain::{Config, RepoSource, SelectedFile, SelectionStats, REPORT_SCHEMA_VERSION};

/// Write `report.json`-style metadata next to the document.
pub fn write_report(
    path: &Path,
    source: &RepoSource,
    config: &Config,
    stats: &SelectionStats,
    files: &[SelectedFile],
    generated_at: Option<&str>,
) -> Result<()> {
    let files_json: Vec<serde_json::Value> = files
        .iter()
        .map(|f| {
            json!({
                "path": f.relative_path,
                "size_bytes": f.size_bytes,
                "kind": f.kind,
            })
        })
        .collect();

    let mut report = json!({
        "schema_version": REPORT_SCHEMA_VERSION,
        "source": source.as_str(),
        "config": {
            "branch": config.branch,
            "max_mb": config.max_mb,
            "extensions": config.extensions,
            "excluded_dirs": config.excluded_dirs,
            "exclude_globs": config.exclude_globs,
            "output": config.output_name,
        },
        "stats": stats,
        "files": files_json,
    });
    if let Some(generated_at) = generated_at {
        report["generated_at"] = json!(generated_at);
    }

    let body = serde_json::to_string_pretty(&report)?;
    fs::write(path, body + "\n").with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
