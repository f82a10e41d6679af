// src/merger.rs

//! Joins the file-change table with a file-size table on relative path.

use crate::error::LedgerResult;
use crate::table::Table;
use anyhow::Context;
use std::path::Path;
use tracing::{debug, info, warn};

/// Join key shared by both sides
pub const JOIN_KEY: &str = "relative_path";

/// How the sizing tool writes the repository root directory
pub const ROOT_SENTINEL: &str = ".";

/// Size-table columns that add nothing once rows are keyed by relative path
pub const SIZE_BOOKKEEPING_COLUMNS: [&str; 2] = ["root", "fullpath"];

/// Prepares the file-change side: key on the post-change path, blank out missing cells.
pub fn prepare_file_commits(mut file_commits: Table) -> LedgerResult<Table> {
    file_commits.copy_column("new_path", JOIN_KEY)?;
    file_commits.fill_missing();
    Ok(file_commits)
}

/// Prepares the size side: root sentinel to `""`, bookkeeping columns dropped.
pub fn prepare_file_sizes(mut file_sizes: Table) -> LedgerResult<Table> {
    file_sizes.column_index("filename")?;
    if !file_sizes.has_column(JOIN_KEY) {
        file_sizes.copy_column("path", JOIN_KEY)?;
    }
    for column in ["path", JOIN_KEY] {
        let replaced = file_sizes.replace_value(column, ROOT_SENTINEL, "")?;
        debug!("Normalized {} root paths in {}", replaced, column);
    }
    file_sizes.drop_columns(&SIZE_BOOKKEEPING_COLUMNS)?;
    Ok(file_sizes)
}

/// Inner join of prepared tables. The size table's `filename` wins.
pub fn merge_tables(file_commits: Table, file_sizes: Table) -> LedgerResult<Table> {
    let file_commits = prepare_file_commits(file_commits)?;
    let file_sizes = prepare_file_sizes(file_sizes)?;

    let mut merged = file_commits.inner_join(&file_sizes, JOIN_KEY)?;
    merged.drop_columns(&["filename_x"])?;
    merged.rename_column("filename_y", "filename")?;
    Ok(merged)
}

/// Builds `MergedFileData.csv` from `FileCommits.csv` and a file-size table.
pub fn generate_merged_file_data(
    file_commits_path: &Path,
    file_size_data_path: &Path,
    output_file: &Path,
) -> anyhow::Result<Table> {
    info!("Loading file commit data from {}", file_commits_path.display());
    let file_commits = Table::read_csv(file_commits_path)
        .with_context(|| format!("Failed to read {}", file_commits_path.display()))?;

    info!("Loading file size data from {}", file_size_data_path.display());
    let file_sizes = Table::read_csv(file_size_data_path)
        .with_context(|| format!("Failed to read {}", file_size_data_path.display()))?;

    let commit_rows = file_commits.len();
    let merged = merge_tables(file_commits, file_sizes)?;
    debug!(
        "{} of {} file commits matched a sized file",
        merged.len(),
        commit_rows
    );
    if merged.is_empty() && commit_rows > 0 {
        warn!("No file commit matched a sized file; is the size table from the same checkout?");
    }

    merged
        .write_csv(output_file)
        .with_context(|| format!("Failed to write {}", output_file.display()))?;
    info!("Merged file data created in {}", output_file.display());
    Ok(merged)
}
