// src/cli.rs

use crate::analyzer::{self, ExtractOptions};
use crate::{authors, file_sizes, merger};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Turns git history into CSV tables
#[derive(Parser, Debug)]
#[command(name = "git-ledger", author, version, about, long_about = None)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract one row per commit and one per (commit, modified file)
    Extract {
        /// Local path or clone URL of the repository to analyze
        repo: String,

        /// Commit table to write
        #[arg(long, default_value = "Commits.csv")]
        commits: PathBuf,

        /// File-change table to write
        #[arg(long, default_value = "FileCommits.csv")]
        file_commits: PathBuf,

        /// Walk this branch or revision instead of HEAD
        #[arg(long)]
        branch: Option<String>,

        /// Only commits on or after this date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_date)]
        since: Option<DateTime<Utc>>,

        /// Only commits on or before this date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_date)]
        until: Option<DateTime<Utc>>,

        /// Stop after this many commits, oldest first
        #[arg(long)]
        max_commits: Option<usize>,

        /// Skip the delta-maintainability columns
        #[arg(long)]
        no_dmm: bool,

        /// Hide the progress bar
        #[arg(long)]
        quiet: bool,
    },

    /// Build the table of unique authors and committers
    Authors {
        /// Commit table to read
        #[arg(long, default_value = "Commits.csv")]
        commits: PathBuf,

        /// Author table to write
        #[arg(short, long, default_value = "Authors.csv")]
        output: PathBuf,
    },

    /// Join file changes with file sizes on relative path
    Merge {
        /// File-change table to read
        #[arg(long, default_value = "FileCommits.csv")]
        file_commits: PathBuf,

        /// File-size table to read
        #[arg(long, default_value = "FileSizes.csv")]
        file_sizes: PathBuf,

        /// Merged table to write
        #[arg(short, long, default_value = "MergedFileData.csv")]
        output: PathBuf,
    },

    /// Measure the files of a working tree
    Sizes {
        /// Working tree to measure
        #[arg(default_value = ".")]
        root: PathBuf,

        /// File-size table to write
        #[arg(short, long, default_value = "FileSizes.csv")]
        output: PathBuf,
    },
}

/// Accepts a plain date (midnight UTC) or a full RFC 3339 timestamp
fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("'{}' is not a date (YYYY-MM-DD or RFC 3339)", s))
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Extract {
            repo,
            commits,
            file_commits,
            branch,
            since,
            until,
            max_commits,
            no_dmm,
            quiet,
        } => {
            let options = ExtractOptions {
                branch,
                since,
                until,
                max_commits,
                dmm: !no_dmm,
                progress: !quiet,
            };
            analyzer::analyze_repository(&repo, &commits, &file_commits, &options)?;
        }
        Command::Authors { commits, output } => {
            authors::identify_authors(&commits, &output)?;
        }
        Command::Merge {
            file_commits,
            file_sizes,
            output,
        } => {
            merger::generate_merged_file_data(&file_commits, &file_sizes, &output)?;
        }
        Command::Sizes { root, output } => {
            file_sizes::scan_file_sizes(&root, &output)?;
        }
    }
    Ok(())
}
