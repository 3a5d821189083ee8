//! Failed-identifier list, one identifier per line
//!
//! Written at the end of a run and read back by `--retry-failed`.

use crate::output::summary::CrawlSummary;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes the failed identifiers of `summary` to `path`, replacing it atomically
pub fn write_failed_ids(summary: &CrawlSummary, path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    for id in summary.failed_ids() {
        writeln!(temp, "{}", id)?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Reads identifiers from `path`, skipping blank lines and `#` comments
pub fn load_failed_ids(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_id_list(&content))
}

fn parse_id_list(content: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if !ids.iter().any(|existing| existing == line) {
            ids.push(line.to_string());
        }
    }
    ids
}
