// src/analyzer.rs

//! Commit extraction: one record per commit and one per (commit, file).

use crate::branches::BranchIndex;
use crate::error::{LedgerError, LedgerResult};
use crate::maintainability::{DmmAccumulator, SourceLanguage};
use crate::model::*;
use crate::source::{OpenedRepo, RepoLocation};
use crate::table::write_records;
use anyhow::Context;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use git2::{Commit, Delta, Diff, DiffFindOptions, DiffOptions, Oid, Repository, Sort};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info, warn};

/// Knobs of the extract stage
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Walk this branch (or any revision) instead of HEAD
    pub branch: Option<String>,
    /// Only commits with a committer date at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Only commits with a committer date at or before this instant
    pub until: Option<DateTime<Utc>>,
    pub max_commits: Option<usize>,
    /// Compute the delta-maintainability columns
    pub dmm: bool,
    pub progress: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            branch: None,
            since: None,
            until: None,
            max_commits: None,
            dmm: true,
            progress: true,
        }
    }
}

/// Output of the extract stage
#[derive(Debug)]
pub struct Extraction {
    pub commits: Vec<CommitRecord>,
    pub file_changes: Vec<FileChangeRecord>,
    /// Commits that could not be read and were left out
    pub skipped: usize,
}

/// Pulls all commits of a repository and writes the commit and file-change tables.
pub fn analyze_repository(
    location: &str,
    commits_file_path: &Path,
    file_commits_file_path: &Path,
    options: &ExtractOptions,
) -> anyhow::Result<Extraction> {
    info!("Analyzing Git Repository at {}", location);
    let location = RepoLocation::parse(location)?;
    let opened = OpenedRepo::open(&location)
        .with_context(|| format!("Failed to open git repository at {:?}", location))?;

    let extraction = extract(&opened, options)?;

    write_records(commits_file_path, &CommitRecord::COLUMNS, &extraction.commits)
        .with_context(|| format!("Failed to write {}", commits_file_path.display()))?;
    info!(
        "Saved {} commits to {}",
        extraction.commits.len(),
        commits_file_path.display()
    );

    write_records(
        file_commits_file_path,
        &FileChangeRecord::COLUMNS,
        &extraction.file_changes,
    )
    .with_context(|| format!("Failed to write {}", file_commits_file_path.display()))?;
    info!(
        "Saved {} file commits to {}",
        extraction.file_changes.len(),
        file_commits_file_path.display()
    );

    Ok(extraction)
}

/// Builds both record sets from an opened repository.
pub fn extract(opened: &OpenedRepo, options: &ExtractOptions) -> LedgerResult<Extraction> {
    let (commits, skipped) = build_commits(&opened.repo, options)?;
    let file_changes = build_file_commits(&commits, &opened.project);
    Ok(Extraction {
        commits: commits.into_iter().map(|c| c.record).collect(),
        file_changes,
        skipped,
    })
}

/// Walks the history oldest first. Commits that fail to build are logged and skipped.
pub fn build_commits(
    repo: &Repository,
    options: &ExtractOptions,
) -> LedgerResult<(Vec<ExtractedCommit>, usize)> {
    let oids = commit_oids(repo, options)?;
    let branches = BranchIndex::build(repo)?;

    let bar = if options.progress {
        ProgressBar::new(oids.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar.set_message("Reading commits");

    let result = build_each(oids, |oid| {
        bar.inc(1);
        let commit = repo.find_commit(oid)?;
        build_commit(repo, &commit, &branches, options)
    });
    bar.finish_with_message("Commits read");

    if result.1 > 0 {
        warn!("Skipped {} unreadable commits", result.1);
    }
    Ok(result)
}

/// Runs `build` on every oid, dropping (and logging) the ones that fail.
fn build_each<T, E, F>(oids: Vec<Oid>, mut build: F) -> (Vec<T>, usize)
where
    E: Display,
    F: FnMut(Oid) -> Result<T, E>,
{
    let mut built = Vec::with_capacity(oids.len());
    let mut skipped = 0;
    for oid in oids {
        match build(oid) {
            Ok(item) => built.push(item),
            Err(e) => {
                warn!(hash = %oid, error = %e, "Problem reading commit");
                skipped += 1;
            }
        }
    }
    (built, skipped)
}

/// Commit ids to visit, oldest first
fn commit_oids(repo: &Repository, options: &ExtractOptions) -> LedgerResult<Vec<Oid>> {
    let mut revwalk = repo.revwalk()?;
    match &options.branch {
        Some(rev) => {
            let start = repo.revparse_single(rev)?.peel_to_commit()?;
            revwalk.push(start.id())?;
        }
        None => revwalk.push_head()?,
    }
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let bounded = options.since.is_some() || options.until.is_some();
    let mut oids = Vec::new();
    for oid in revwalk {
        let oid = oid?;
        if !bounded || within_dates(repo, oid, options) {
            oids.push(oid);
        }
    }
    oids.reverse(); // Walk from the first commit to the last

    if let Some(max) = options.max_commits {
        oids.truncate(max);
    }
    debug!("{} commits to read", oids.len());
    Ok(oids)
}

/// Whether the committer date falls inside `--since`/`--until`. Commits that
/// cannot be read are kept so the build step logs and skips them.
fn within_dates(repo: &Repository, oid: Oid, options: &ExtractOptions) -> bool {
    let Ok(commit) = repo.find_commit(oid) else {
        return true;
    };
    let seconds = commit.time().seconds();
    !(options.since.is_some_and(|s| seconds < s.timestamp())
        || options.until.is_some_and(|u| seconds > u.timestamp()))
}

fn build_commit(
    repo: &Repository,
    commit: &Commit,
    branches: &BranchIndex,
    options: &ExtractOptions,
) -> LedgerResult<ExtractedCommit> {
    let oid = commit.id();
    let message = String::from_utf8_lossy(commit.message_bytes());
    let is_merge = commit.parent_count() > 1;

    let diff = first_parent_diff(repo, commit)?;
    let stats = diff.stats()?;

    // Merge commits carry no per-file changes
    let modified_files = if is_merge {
        Vec::new()
    } else {
        collect_file_changes(&diff)
    };

    let dmm = if options.dmm && !is_merge {
        delta_maintainability(repo, &diff)?
    } else {
        DeltaMaintainability::default()
    };

    let files = modified_files
        .iter()
        .filter_map(|f| f.new_path.clone())
        .collect();

    let record = CommitRecord::new(CommitFields {
        hash: oid.to_string(),
        message: sanitize_message(message.trim()),
        author: actor(&commit.author())?,
        committer: actor(&commit.committer())?,
        in_main: branches.in_main(oid),
        is_merge,
        insertions: stats.insertions(),
        deletions: stats.deletions(),
        num_files: stats.files_changed(),
        branches: branches.branches_of(oid),
        files,
        dmm,
    });

    Ok(ExtractedCommit {
        record,
        modified_files,
    })
}

/// Diff against the first parent, or against the empty tree for a root commit
fn first_parent_diff<'r>(repo: &'r Repository, commit: &Commit) -> Result<Diff<'r>, git2::Error> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let mut diff_opts = DiffOptions::new();
    diff_opts.ignore_filemode(true);
    let mut diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;

    let mut find_opts = DiffFindOptions::new();
    find_opts.renames(true);
    diff.find_similar(Some(&mut find_opts))?;
    Ok(diff)
}

fn collect_file_changes(diff: &Diff) -> Vec<FileChange> {
    diff.deltas()
        .map(|delta| {
            let old_path = delta.old_file().path().map(path_string);
            let new_path = delta.new_file().path().map(path_string);
            let (old_path, new_path) = match delta.status() {
                Delta::Added | Delta::Untracked => (None, new_path),
                Delta::Deleted => (old_path, None),
                _ => (old_path, new_path),
            };
            let filename = new_path
                .as_deref()
                .or(old_path.as_deref())
                .map(file_name)
                .unwrap_or_default();
            FileChange {
                filename,
                old_path,
                new_path,
            }
        })
        .collect()
}

fn delta_maintainability(repo: &Repository, diff: &Diff) -> LedgerResult<DeltaMaintainability> {
    let mut acc = DmmAccumulator::new();
    for delta in diff.deltas() {
        let path = delta.new_file().path().or_else(|| delta.old_file().path());
        let Some(language) = path.and_then(SourceLanguage::from_path) else {
            continue;
        };
        let old = blob_text(repo, delta.old_file().id())?;
        let new = blob_text(repo, delta.new_file().id())?;
        acc.add_file(language, old.as_deref(), new.as_deref());
    }
    Ok(acc.finish())
}

/// Text of a blob; None for the zero id (file absent on that side) and for binary content
fn blob_text(repo: &Repository, id: Oid) -> LedgerResult<Option<String>> {
    if id.is_zero() {
        return Ok(None);
    }
    let blob = repo.find_blob(id)?;
    if blob.is_binary() {
        return Ok(None);
    }
    Ok(std::str::from_utf8(blob.content()).ok().map(str::to_string))
}

fn actor(signature: &git2::Signature) -> LedgerResult<Actor> {
    let when = signature.when();
    Ok(Actor {
        name: String::from_utf8_lossy(signature.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(signature.email_bytes()).into_owned(),
        date: git_time(&when)?,
        tz: i64::from(when.offset_minutes()) * 60,
    })
}

/// Converts a git timestamp, keeping its UTC offset
fn git_time(time: &git2::Time) -> LedgerResult<DateTime<FixedOffset>> {
    let invalid = || LedgerError::InvalidTime {
        seconds: time.seconds(),
        offset_minutes: time.offset_minutes(),
    };
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).ok_or_else(invalid)?;
    offset
        .timestamp_opt(time.seconds(), 0)
        .single()
        .ok_or_else(invalid)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Flattens a commit message into a single delimited-table cell.
///
/// Line breaks become spaces; commas and double quotes are removed.
pub fn sanitize_message(msg: &str) -> String {
    msg.replace("\r\n", " ")
        .replace('\n', " ")
        .replace([',', '"'], "")
}

/// Expands every commit across its modified files.
pub fn build_file_commits(commits: &[ExtractedCommit], project: &Project) -> Vec<FileChangeRecord> {
    commits
        .iter()
        .flat_map(|commit| {
            commit
                .modified_files
                .iter()
                .map(|file| FileChangeRecord::new(&commit.record, file, project))
        })
        .collect()
}
