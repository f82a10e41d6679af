// src/branches.rs

//! Branch membership of commits: which local branches reach a commit and
//! whether the main branch does. The main branch is the one HEAD points at.

use git2::{BranchType, Oid, Repository};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Names tried, in order, when HEAD is detached or unborn
const MAIN_BRANCH_NAMES: [&str; 2] = ["main", "master"];

/// Reachability of every commit from every local branch tip, computed once per run.
pub struct BranchIndex {
    membership: HashMap<Oid, BTreeSet<String>>,
    main: HashSet<Oid>,
}

impl BranchIndex {
    pub fn build(repo: &Repository) -> Result<Self, git2::Error> {
        let mut membership: HashMap<Oid, BTreeSet<String>> = HashMap::new();
        let mut tips: HashMap<String, Oid> = HashMap::new();

        for branch in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                continue;
            };
            let Some(tip) = branch.get().target() else {
                continue;
            };
            for oid in reachable_from(repo, tip)? {
                membership.entry(oid).or_default().insert(name.clone());
            }
            tips.insert(name, tip);
        }

        let main_tip = match repo.head() {
            Ok(head) if head.is_branch() => {
                debug!("Main branch is {}", head.shorthand().unwrap_or("HEAD"));
                head.target()
            }
            _ => MAIN_BRANCH_NAMES
                .iter()
                .find_map(|name| tips.get(*name).copied())
                .or_else(|| head_target(repo)),
        };
        let main = match main_tip {
            Some(tip) => reachable_from(repo, tip)?,
            None => HashSet::new(),
        };

        debug!(
            "Indexed {} branches covering {} commits",
            tips.len(),
            membership.len()
        );
        Ok(Self { membership, main })
    }

    /// Branch names containing the commit, sorted
    pub fn branches_of(&self, oid: Oid) -> Vec<String> {
        self.membership
            .get(&oid)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn in_main(&self, oid: Oid) -> bool {
        self.main.contains(&oid)
    }
}

fn head_target(repo: &Repository) -> Option<Oid> {
    repo.head().ok().and_then(|head| head.target())
}

fn reachable_from(repo: &Repository, tip: Oid) -> Result<HashSet<Oid>, git2::Error> {
    let mut revwalk = repo.revwalk()?;
    revwalk.push(tip)?;
    revwalk.collect()
}
