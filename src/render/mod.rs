//! Output rendering
//!
//! Turns the selector's file list into one Markdown document and, optionally,
//! a JSON report describing the run.

mod report;

pub use report::write_report;

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::{get_language, FileEntry, RepoSource, SelectedFile, SelectionStats};
use crate::utils::read_file_safe;

/// Document preamble values.
#[derive(Debug, Clone)]
pub struct DocumentHeader<'a> {
    pub source: &'a RepoSource,
    /// Pre-formatted generation time; `None` omits the line
    pub generated_at: Option<String>,
}

/// Load a selected file's text for rendering. Read failures are kept on the
/// entry so the document can say what went wrong.
pub fn load_entry(file: &SelectedFile) -> FileEntry {
    let content = match read_file_safe(&file.path) {
        Ok((text, encoding)) => {
            if encoding != "UTF-8" {
                debug!("decoded {} as {encoding}", file.relative_path);
            }
            Ok(text)
        }
        Err(err) => {
            warn!("could not read {}: {err}", file.relative_path);
            Err(err.to_string())
        }
    };
    FileEntry {
        relative_path: file.relative_path.clone(),
        size_bytes: file.size_bytes,
        extension: file.extension.clone(),
        content,
    }
}

/// Write the combined document to `output`, creating its directory.
///
/// Files are read one at a time in the given order and dropped after they
/// are written.
pub fn render_document(
    output: &Path,
    header: &DocumentHeader<'_>,
    files: &[SelectedFile],
    stats: &mut SelectionStats,
) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    write_preamble(&mut writer, header, files.len())?;
    for selected in files {
        let entry = load_entry(selected);
        debug!("rendering {} ({} bytes)", entry.relative_path, entry.size_bytes);
        if entry.content.is_err() {
            stats.files_unreadable += 1;
        }
        write_entry(&mut writer, &entry)?;
    }

    writer.flush().with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

fn write_preamble<W: Write>(
    out: &mut W,
    header: &DocumentHeader<'_>,
    file_count: usize,
) -> std::io::Result<()> {
    writeln!(out, "# Repository: {}", header.source.name())?;
    writeln!(out)?;
    writeln!(out, "- Source: {}", header.source)?;
    if let Some(generated_at) = &header.generated_at {
        writeln!(out, "- Generated: {generated_at}")?;
    }
    writeln!(out, "- Files: {file_count}")?;
    Ok(())
}

/// One file block: separator, path header, fenced content.
pub fn write_entry<W: Write>(out: &mut W, entry: &FileEntry) -> std::io::Result<()> {
    write!(out, "\n---\n\n### {}\n\n", header_path(&entry.relative_path))?;

    let text = match &entry.content {
        Ok(text) => text.as_str(),
        Err(err) => {
            return writeln!(out, "<Could not read file: {err}>");
        }
    };

    let fence = fence_for(text);
    writeln!(out, "{fence}{}", get_language(&entry.extension))?;
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        writeln!(out)?;
    }
    writeln!(out, "{fence}")
}

/// The path as an inline code span that stays on one line.
///
/// Control characters are escaped (`\n` becomes `\\n`) and the delimiter is one
/// backtick longer than any run inside the path.
fn header_path(path: &str) -> String {
    let escaped: String = path
        .chars()
        .map(|c| if c.is_control() { c.escape_default().to_string() } else { c.to_string() })
        .collect();
    let ticks = "`".repeat(longest_backtick_run(&escaped) + 1);
    if escaped.starts_with('`') || escaped.ends_with('`') {
        format!("{ticks} {escaped} {ticks}")
    } else {
        format!("{ticks}{escaped}{ticks}")
    }
}

/// A backtick fence longer than any backtick run inside `text` (minimum three).
fn fence_for(text: &str) -> String {
    "`".repeat((longest_backtick_run(text) + 1).max(3))
}

fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0usize;
    let mut run = 0usize;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}
