// src/model.rs

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One side of a commit signature: who and when.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub name: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
    /// Offset from UTC in seconds, positive east of Greenwich
    pub tz: i64,
}

/// A file touched by a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub filename: String,
    /// None when the file was added
    pub old_path: Option<String>,
    /// None when the file was deleted
    pub new_path: Option<String>,
}

/// Delta-maintainability scores of one commit
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeltaMaintainability {
    pub unit_size: Option<f64>,
    pub unit_complexity: Option<f64>,
    pub unit_interfacing: Option<f64>,
}

/// A commit as it is extracted from the repository.
///
/// Carries the modified files so the file-change table can be derived
/// without walking the history a second time.
#[derive(Debug, Clone)]
pub struct ExtractedCommit {
    pub record: CommitRecord,
    pub modified_files: Vec<FileChange>,
}

/// Row of `Commits.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub author_tz: i64,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: DateTime<FixedOffset>,
    pub committer_tz: i64,
    pub in_main: bool,
    pub is_merge: bool,
    pub num_deletes: usize,
    pub num_inserts: usize,
    pub net_lines: i64,
    pub num_files: usize,
    pub branches: String,
    pub files: String,
    pub dmm_unit_size: Option<f64>,
    pub dmm_unit_complexity: Option<f64>,
    pub dmm_unit_interfacing: Option<f64>,
}

/// Commit-level data that is not derived from other fields
#[derive(Debug, Clone)]
pub struct CommitFields {
    pub hash: String,
    pub message: String,
    pub author: Actor,
    pub committer: Actor,
    pub in_main: bool,
    pub is_merge: bool,
    pub insertions: usize,
    pub deletions: usize,
    pub num_files: usize,
    pub branches: Vec<String>,
    pub files: Vec<String>,
    pub dmm: DeltaMaintainability,
}

impl CommitRecord {
    pub const COLUMNS: [&'static str; 21] = [
        "hash",
        "message",
        "author_name",
        "author_email",
        "author_date",
        "author_tz",
        "committer_name",
        "committer_email",
        "committer_date",
        "committer_tz",
        "in_main",
        "is_merge",
        "num_deletes",
        "num_inserts",
        "net_lines",
        "num_files",
        "branches",
        "files",
        "dmm_unit_size",
        "dmm_unit_complexity",
        "dmm_unit_interfacing",
    ];

    /// Builds the record, deriving `net_lines` and joining the list columns.
    pub fn new(fields: CommitFields) -> Self {
        let CommitFields {
            hash,
            message,
            author,
            committer,
            in_main,
            is_merge,
            insertions,
            deletions,
            num_files,
            branches,
            files,
            dmm,
        } = fields;

        Self {
            hash,
            message,
            author_name: author.name,
            author_email: author.email,
            author_date: author.date,
            author_tz: author.tz,
            committer_name: committer.name,
            committer_email: committer.email,
            committer_date: committer.date,
            committer_tz: committer.tz,
            in_main,
            is_merge,
            num_deletes: deletions,
            num_inserts: insertions,
            net_lines: insertions as i64 - deletions as i64,
            num_files,
            branches: branches.join(", "),
            files: files.join(", "),
            dmm_unit_size: dmm.unit_size,
            dmm_unit_complexity: dmm.unit_complexity,
            dmm_unit_interfacing: dmm.unit_interfacing,
        }
    }
}

/// Row of `FileCommits.csv`: one per (commit, modified file)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChangeRecord {
    pub hash: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: DateTime<FixedOffset>,
    pub author_tz: i64,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: DateTime<FixedOffset>,
    pub committer_tz: i64,
    pub in_main: bool,
    pub is_merge: bool,
    pub num_deletes: usize,
    pub num_inserts: usize,
    pub net_lines: i64,
    pub branches: String,
    pub filename: String,
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub project_name: String,
    pub project_path: String,
}

impl FileChangeRecord {
    pub const COLUMNS: [&'static str; 21] = [
        "hash",
        "message",
        "author_name",
        "author_email",
        "author_date",
        "author_tz",
        "committer_name",
        "committer_email",
        "committer_date",
        "committer_tz",
        "in_main",
        "is_merge",
        "num_deletes",
        "num_inserts",
        "net_lines",
        "branches",
        "filename",
        "old_path",
        "new_path",
        "project_name",
        "project_path",
    ];

    pub fn new(commit: &CommitRecord, file: &FileChange, project: &Project) -> Self {
        Self {
            hash: commit.hash.clone(),
            message: commit.message.clone(),
            author_name: commit.author_name.clone(),
            author_email: commit.author_email.clone(),
            author_date: commit.author_date,
            author_tz: commit.author_tz,
            committer_name: commit.committer_name.clone(),
            committer_email: commit.committer_email.clone(),
            committer_date: commit.committer_date,
            committer_tz: commit.committer_tz,
            in_main: commit.in_main,
            is_merge: commit.is_merge,
            num_deletes: commit.num_deletes,
            num_inserts: commit.num_inserts,
            net_lines: commit.net_lines,
            branches: commit.branches.clone(),
            filename: file.filename.clone(),
            old_path: file.old_path.clone(),
            new_path: file.new_path.clone(),
            project_name: project.name.clone(),
            project_path: project.path.clone(),
        }
    }
}

/// Name and working directory of the analysed repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub path: String,
}

/// Deduplication key of the author table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorIdentity {
    pub name: String,
    pub email: String,
    /// UTC offset in seconds
    pub timezone: i64,
}

/// A guessed place for a UTC offset. Display approximation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub city: &'static str,
    pub state: Option<&'static str>,
    pub country: &'static str,
}

/// Row of `Authors.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub name: String,
    pub email: String,
    pub timezone: i64,
    pub timezone_hours: f64,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
}

impl AuthorRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "name",
        "email",
        "timezone",
        "timezone_hours",
        "city",
        "state",
        "country",
    ];

    pub fn new(identity: AuthorIdentity, timezone_hours: f64, location: Location) -> Self {
        Self {
            name: identity.name,
            email: identity.email,
            timezone: identity.timezone,
            timezone_hours,
            city: location.city.to_string(),
            state: location.state.map(str::to_string),
            country: location.country.to_string(),
        }
    }
}

/// Row of `FileSizes.csv` as produced by the sizes stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSizeRecord {
    pub root: String,
    pub path: String,
    pub filename: String,
    pub fullpath: String,
    pub relative_path: String,
    pub extension: String,
    pub size_bytes: u64,
    pub lines: Option<usize>,
}

impl FileSizeRecord {
    pub const COLUMNS: [&'static str; 8] = [
        "root",
        "path",
        "filename",
        "fullpath",
        "relative_path",
        "extension",
        "size_bytes",
        "lines",
    ];
}
