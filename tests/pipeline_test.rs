//! End-to-end runs of the four stages against throwaway repositories.
//!
//! Each test builds its own repository in a temp directory with git2 and
//! writes every table next to it.

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature, Time};
use git_ledger::analyzer::{analyze_repository, ExtractOptions};
use git_ledger::authors::identify_authors;
use git_ledger::file_sizes::scan_file_sizes;
use git_ledger::merger::generate_merged_file_data;
use git_ledger::table::Table;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct TestRepo {
    dir: TempDir,
    repo: Repository,
}

impl TestRepo {
    fn new() -> TestRepo {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Failed to init repo");
        TestRepo { dir, repo }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, body: &str) {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, body).unwrap();
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    /// Points the index back at a commit's tree; the working directory is left alone.
    fn reset_index_to(&self, oid: Oid) {
        let tree = self.repo.find_commit(oid).unwrap().tree().unwrap();
        let mut index = self.repo.index().unwrap();
        index.read_tree(&tree).unwrap();
        index.write().unwrap();
    }

    fn commit_as(&self, who: (&str, &str, i32), msg: &str, parents: &[Oid]) -> Oid {
        let (name, email, offset) = who;
        let sig = Signature::new(name, email, &Time::new(1_650_000_000, offset)).unwrap();
        let mut index = self.repo.index().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let parents: Vec<Commit> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<&Commit> = parents.iter().collect();
        self.repo
            .commit(Some("HEAD"), &sig, &sig, msg, &tree, &parent_refs)
            .unwrap()
    }
}

struct Outputs {
    _dir: TempDir,
    commits: PathBuf,
    file_commits: PathBuf,
    authors: PathBuf,
    sizes: PathBuf,
    merged: PathBuf,
}

impl Outputs {
    fn new() -> Outputs {
        let dir = tempfile::tempdir().unwrap();
        let at = |name: &str| dir.path().join(name);
        Outputs {
            commits: at("Commits.csv"),
            file_commits: at("FileCommits.csv"),
            authors: at("Authors.csv"),
            sizes: at("FileSizes.csv"),
            merged: at("MergedFileData.csv"),
            _dir: dir,
        }
    }
}

fn quiet() -> ExtractOptions {
    ExtractOptions {
        progress: false,
        ..ExtractOptions::default()
    }
}

const NEW_YORK: (&str, &str, i32) = ("A", "a@x.com", -300);
const BERLIN: (&str, &str, i32) = ("B", "b@x.com", 60);

#[test]
fn test_full_pipeline() {
    let repo = TestRepo::new();
    repo.write("README.md", "# demo\n");
    repo.write("src/main.rs", "fn main() {\n    println!(\"hi\");\n}\n");
    let first = repo.commit_as(NEW_YORK, "Initial commit\n\nWith body, and \"quotes\"", &[]);

    repo.write("src/main.rs", "fn main() {\n    run();\n}\n\nfn run() {}\n");
    repo.commit_as(NEW_YORK, "Add run", &[first]);

    let out = Outputs::new();
    let location = repo.path().to_string_lossy().into_owned();
    let extraction =
        analyze_repository(&location, &out.commits, &out.file_commits, &quiet()).unwrap();

    assert_eq!(extraction.skipped, 0);
    assert_eq!(extraction.commits.len(), 2);
    assert_eq!(extraction.file_changes.len(), 3);
    for commit in &extraction.commits {
        assert_eq!(
            commit.net_lines,
            commit.num_inserts as i64 - commit.num_deletes as i64
        );
    }

    let commits = Table::read_csv(&out.commits).unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits.columns()[0], "hash");
    assert_eq!(commits.columns().len(), 21);
    let messages: Vec<&str> = commits.column("message").unwrap().collect();
    assert_eq!(messages[0], "Initial commit  With body and quotes");

    let file_commits = Table::read_csv(&out.file_commits).unwrap();
    assert_eq!(file_commits.len(), 3);
    let project_names: Vec<&str> = file_commits.column("project_name").unwrap().collect();
    let expected_name = repo.path().file_name().unwrap().to_string_lossy();
    assert!(project_names.iter().all(|n| *n == expected_name));

    let authors = identify_authors(&out.commits, &out.authors).unwrap();
    assert_eq!(authors.len(), 1);
    let author_table = Table::read_csv(&out.authors).unwrap();
    assert_eq!(
        author_table.columns(),
        ["name", "email", "timezone", "timezone_hours", "city", "state", "country"]
    );
    assert_eq!(
        author_table.rows()[0],
        ["A", "a@x.com", "-18000", "-5.0", "New York", "NY", "United States"]
    );

    scan_file_sizes(repo.path(), &out.sizes).unwrap();
    let merged = generate_merged_file_data(&out.file_commits, &out.sizes, &out.merged).unwrap();
    // README once, src/main.rs twice
    assert_eq!(merged.len(), 3);

    let merged_table = Table::read_csv(&out.merged).unwrap();
    assert!(merged_table.has_column("filename"));
    assert!(!merged_table.has_column("filename_x"));
    assert!(!merged_table.has_column("root"));
    assert!(!merged_table.has_column("fullpath"));
    let readme_dirs: Vec<&str> = merged_table
        .rows()
        .iter()
        .filter(|row| row.contains(&"README.md".to_string()))
        .map(|row| row[merged_table.column_index("path").unwrap()].as_str())
        .collect();
    assert_eq!(readme_dirs, vec![""]);
}

#[test]
fn test_merge_commit_and_branches() {
    let repo = TestRepo::new();
    repo.write("a.txt", "a\n");
    let base = repo.commit_as(NEW_YORK, "base", &[]);

    let base_commit = repo.repo.find_commit(base).unwrap();
    repo.repo.branch("feature", &base_commit, false).unwrap();
    repo.repo.set_head("refs/heads/feature").unwrap();
    repo.write("b.txt", "b\n");
    let feature = repo.commit_as(BERLIN, "feature work", &[base]);

    repo.repo.set_head("refs/heads/main").unwrap();
    repo.reset_index_to(base);
    repo.write("c.txt", "c\n");
    let main_tip = repo.commit_as(NEW_YORK, "main work", &[base]);

    repo.write("b.txt", "b\n");
    let merge = repo.commit_as(NEW_YORK, "Merge feature", &[main_tip, feature]);

    let out = Outputs::new();
    let location = repo.path().to_string_lossy().into_owned();
    let extraction =
        analyze_repository(&location, &out.commits, &out.file_commits, &quiet()).unwrap();
    assert_eq!(extraction.commits.len(), 4);

    let by_hash = |oid: Oid| {
        extraction
            .commits
            .iter()
            .find(|c| c.hash == oid.to_string())
            .unwrap()
    };

    let merge_record = by_hash(merge);
    assert!(merge_record.is_merge);
    assert!(merge_record.in_main);
    assert!(extraction
        .file_changes
        .iter()
        .all(|row| row.hash != merge.to_string()));

    let feature_record = by_hash(feature);
    assert!(!feature_record.is_merge);
    // reachable from main through the merge
    assert!(feature_record.in_main);
    assert_eq!(feature_record.branches, "feature, main");
    assert_eq!(by_hash(main_tip).branches, "main");
    assert_eq!(by_hash(base).branches, "feature, main");

    // file rows: base a.txt, feature b.txt, main c.txt
    assert_eq!(extraction.file_changes.len(), 3);

    let authors = identify_authors(&out.commits, &out.authors).unwrap();
    let cities: Vec<&str> = authors.iter().map(|a| a.city.as_str()).collect();
    assert_eq!(cities, vec!["New York", "Unknown"]);
    assert_eq!(authors[1].name, "B");
    assert_eq!(authors[1].timezone, 3600);
}

#[test]
fn test_missing_repository_fails() {
    let out = Outputs::new();
    let missing = tempfile::tempdir().unwrap();
    let location = missing.path().join("absent").to_string_lossy().into_owned();
    assert!(analyze_repository(&location, &out.commits, &out.file_commits, &quiet()).is_err());
    assert!(!out.commits.exists());
}

#[test]
fn test_merge_rejects_size_table_without_bookkeeping_columns() {
    let out = Outputs::new();
    std::fs::write(
        &out.file_commits,
        ",hash,filename,old_path,new_path\n0,h,a.rs,,a.rs\n",
    )
    .unwrap();
    std::fs::write(&out.sizes, "path,filename,relative_path\n.,a.rs,a.rs\n").unwrap();

    assert!(generate_merged_file_data(&out.file_commits, &out.sizes, &out.merged).is_err());
    assert!(!out.merged.exists());
}
