// src/file_sizes.rs

//! Sizes of the files in a working tree, in the layout the merge stage expects.

use crate::merger::ROOT_SENTINEL;
use crate::model::FileSizeRecord;
use crate::table::write_records;
use anyhow::Context;
use ignore::WalkBuilder;
use std::path::Path;
use tracing::{debug, info, warn};

/// One row per file below `root`, honouring `.gitignore`, sorted by relative path.
pub fn collect_file_sizes(root: &Path) -> anyhow::Result<Vec<FileSizeRecord>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", root.display()))?;

    let walker = WalkBuilder::new(&root)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|e| e.file_name() != ".git")
        .build();

    let mut records = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(&root) else {
            continue;
        };

        let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or_default();
        let lines = match std::fs::read(path) {
            Ok(bytes) => Some(count_lines(&bytes)),
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        };

        records.push(FileSizeRecord {
            root: root.to_string_lossy().into_owned(),
            path: parent_dir(relative),
            filename: relative
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            fullpath: path.to_string_lossy().into_owned(),
            relative_path: slash_path(relative),
            extension: relative
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes,
            lines,
        });
    }

    records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(records)
}

/// Builds `FileSizes.csv` for a working tree.
pub fn scan_file_sizes(root: &Path, output_file: &Path) -> anyhow::Result<Vec<FileSizeRecord>> {
    info!("Measuring files under {}", root.display());
    let records = collect_file_sizes(root)?;
    write_records(output_file, &FileSizeRecord::COLUMNS, &records)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;
    info!("Saved {} file sizes to {}", records.len(), output_file.display());
    Ok(records)
}

/// Directory of a relative file path, `.` for the root
fn parent_dir(relative: &Path) -> String {
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => slash_path(parent),
        _ => ROOT_SENTINEL.to_string(),
    }
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Newline count, plus one for a final line without a newline
fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}
