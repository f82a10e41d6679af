// src/source.rs

//! Where the history comes from: a local checkout or a remote URL that
//! gets cloned into a scratch directory for the duration of the run.

use crate::error::{LedgerError, LedgerResult};
use crate::model::Project;
use git2::Repository;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A repository location as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoLocation {
    Local(PathBuf),
    Remote(String),
}

impl RepoLocation {
    pub fn parse(location: &str) -> LedgerResult<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(LedgerError::InvalidLocation("empty location".to_string()));
        }
        if is_remote_url(location) {
            Ok(Self::Remote(location.to_string()))
        } else {
            Ok(Self::Local(PathBuf::from(location)))
        }
    }
}

fn is_remote_url(location: &str) -> bool {
    const SCHEMES: [&str; 5] = ["http://", "https://", "ssh://", "git://", "file://"];
    if SCHEMES.iter().any(|s| location.starts_with(s)) {
        return true;
    }
    // scp-like syntax: user@host:path
    match (location.find('@'), location.find(':')) {
        (Some(at), Some(colon)) => at < colon && !location[..at].contains('/'),
        _ => false,
    }
}

/// An opened repository. Keeps the scratch clone alive while in use.
pub struct OpenedRepo {
    pub repo: Repository,
    pub project: Project,
    _scratch: Option<TempDir>,
}

impl OpenedRepo {
    pub fn open(location: &RepoLocation) -> LedgerResult<Self> {
        match location {
            RepoLocation::Local(path) => {
                let repo = Repository::discover(path)?;
                debug!("Opened git repository at {:?}", repo.path());
                let project = project_for(&repo, None);
                Ok(Self {
                    repo,
                    project,
                    _scratch: None,
                })
            }
            RepoLocation::Remote(url) => {
                let scratch = tempfile::Builder::new().prefix("git-ledger-").tempdir()?;
                info!("Cloning {} into {}", url, scratch.path().display());
                let repo = Repository::clone(url, scratch.path())?;
                let project = project_for(&repo, Some(url));
                Ok(Self {
                    repo,
                    project,
                    _scratch: Some(scratch),
                })
            }
        }
    }
}

fn project_for(repo: &Repository, url: Option<&str>) -> Project {
    let root: &Path = repo.workdir().unwrap_or_else(|| repo.path());
    let name = match url {
        Some(url) => project_name_from_url(url),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    Project {
        name,
        path: root.to_string_lossy().trim_end_matches(['/', '\\']).to_string(),
    }
}

/// Last path segment of a clone URL, without a trailing `.git`
pub fn project_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
