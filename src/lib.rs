// src/lib.rs

//! Git history to CSV tables.
//!
//! Four stages, each reading and writing files so they can run independently:
//!
//! - [`analyzer::analyze_repository`]: `Commits.csv` and `FileCommits.csv`
//! - [`authors::identify_authors`]: `Authors.csv`
//! - [`file_sizes::scan_file_sizes`]: `FileSizes.csv`
//! - [`merger::generate_merged_file_data`]: `MergedFileData.csv`

pub mod analyzer;
pub mod authors;
pub mod branches;
pub mod cli;
pub mod error;
pub mod file_sizes;
pub mod maintainability;
pub mod merger;
pub mod model;
pub mod source;
pub mod table;

pub use error::{LedgerError, LedgerResult};
