//! The repository facade.

use crate::commit::{Commit, validate_path};
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::StagingArea;
use crate::refs::{BranchTip, Head, RefStore};
use crate::status::{StatusReport, classify};
use crate::store::{ObjectStore, atomic_write};
use crate::worktree;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Branch that `init` attaches HEAD to.
pub const DEFAULT_BRANCH: &str = "master";

/// Result of a `commit` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A commit was created and the current ref advanced.
    Created {
        hash: Hash,
        /// The branch that advanced, or None when HEAD was detached.
        branch: Option<String>,
        /// Number of files in the committed snapshot.
        files: usize,
    },
    /// The staging area was empty.
    NothingToCommit,
}

/// One entry of the first-parent history walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub hash: Hash,
    pub message: String,
    pub author: String,
    pub timestamp: String,
    pub parents: Vec<Hash>,
}

/// HEAD position plus the bucketed working-tree classification.
#[derive(Debug, Clone)]
pub struct Status {
    pub head: Head,
    pub report: StatusReport,
}

/// A repository value scoped to one working root.
///
/// All state lives under `.minigit/`; there is no global state. The working
/// tree itself is a derived view that checkout and merge may discard and
/// regenerate from any commit's snapshot.
#[derive(Debug)]
pub struct Repository {
    working_dir: PathBuf,
    minigit_dir: PathBuf,
    store: ObjectStore,
    refs: RefStore,
}

impl Repository {
    /// Initialize a repository at `working_dir`, creating the metadata
    /// layout and the `.gitignore` manifest, and attaching HEAD to the
    /// unborn default branch.
    ///
    /// Returns the repository and whether it was freshly created; an
    /// already-initialized directory is opened as-is.
    pub fn init<P: AsRef<Path>>(working_dir: P) -> Result<(Self, bool)> {
        let working_dir = working_dir.as_ref().to_path_buf();
        let minigit_dir = working_dir.join(worktree::METADATA_DIR);

        if minigit_dir.exists() {
            return Ok((Self::at(working_dir), false));
        }

        fs::create_dir_all(minigit_dir.join("objects"))?;
        fs::create_dir_all(minigit_dir.join("refs").join("heads"))?;

        let repo = Self::at(working_dir);
        repo.refs.attach_head(DEFAULT_BRANCH)?;
        atomic_write(&repo.index_path(), b"")?;

        let gitignore = repo.working_dir.join(worktree::IGNORE_MANIFEST);
        if !gitignore.exists() {
            atomic_write(&gitignore, b".minigit/\n")?;
        }

        Ok((repo, true))
    }

    /// Open the repository governing `start`, searching upward for a
    /// `.minigit` directory.
    pub fn open<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = start.as_ref();
        let mut dir = start;
        loop {
            if dir.join(worktree::METADATA_DIR).is_dir() {
                return Ok(Self::at(dir.to_path_buf()));
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Err(Error::not_a_repository(start)),
            }
        }
    }

    fn at(working_dir: PathBuf) -> Self {
        let minigit_dir = working_dir.join(worktree::METADATA_DIR);
        let store = ObjectStore::new(minigit_dir.join("objects"));
        let refs = RefStore::new(minigit_dir.clone());
        Self {
            working_dir,
            minigit_dir,
            store,
            refs,
        }
    }

    /// The working root this repository is scoped to.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The content-addressed object store.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// The ref and HEAD store.
    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub(crate) fn index_path(&self) -> PathBuf {
        self.minigit_dir.join("index")
    }

    pub(crate) fn load_index(&self) -> Result<StagingArea> {
        StagingArea::load(&self.index_path())
    }

    pub(crate) fn save_index(&self, index: &StagingArea) -> Result<()> {
        index.save(&self.index_path())
    }

    /// Load and parse a commit from the object store.
    pub fn load_commit(&self, hash: &Hash) -> Result<Commit> {
        Commit::load(&self.store, hash)
    }

    /// The commit HEAD resolves to, if any.
    pub fn head_commit(&self) -> Result<Option<Hash>> {
        match self.refs.read_head()? {
            Head::Attached { branch } => Ok(match self.refs.branch(&branch)? {
                Some(BranchTip::At(hash)) => Some(hash),
                _ => None,
            }),
            Head::Detached(hash) => Ok(Some(hash)),
            Head::Unborn => Ok(None),
        }
    }

    /// HEAD's snapshot; empty when HEAD has no commit yet.
    pub fn head_snapshot(&self) -> Result<BTreeMap<String, Hash>> {
        match self.head_commit()? {
            Some(hash) => Ok(self.load_commit(&hash)?.snapshot),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Stage files: hash current content, store the blobs, record them in
    /// the index. Paths are relative to the working root.
    ///
    /// All paths are validated before anything is staged, so a missing file
    /// mutates nothing.
    pub fn add(&self, paths: &[String]) -> Result<()> {
        for path in paths {
            validate_path(path)?;
            if !worktree::join_rel(&self.working_dir, path).is_file() {
                return Err(Error::file_not_found(path.clone()));
            }
        }

        let mut index = self.load_index()?;
        for path in paths {
            let bytes = fs::read(worktree::join_rel(&self.working_dir, path))?;
            let hash = self.store.put(&bytes)?;
            index.stage(path.clone(), hash);
        }
        self.save_index(&index)
    }

    /// Mark files for deletion in the next commit, unstaging them.
    ///
    /// The working copy is left alone; only the pending snapshot changes.
    pub fn remove(&self, paths: &[String]) -> Result<()> {
        let mut index = self.load_index()?;
        for path in paths {
            validate_path(path)?;
            index.mark_removed(path);
        }
        self.save_index(&index)
    }

    /// Create a commit from the staging area and advance the current ref
    /// (or HEAD itself, when detached).
    pub fn commit(&self, message: &str, author: &str) -> Result<CommitOutcome> {
        let mut index = self.load_index()?;
        if index.is_empty() {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let head = self.refs.read_head()?;
        let parent = self.head_commit()?;
        let base_snapshot = self.head_snapshot()?;

        let snapshot = index.snapshot_for_commit(&base_snapshot);
        let files = snapshot.len();
        let commit = Commit::new(
            message,
            author,
            current_timestamp(),
            parent.into_iter().collect(),
            snapshot,
        )?;

        let hash = self.store.put(&commit.serialize())?;

        let branch = match head {
            Head::Attached { branch } => {
                self.refs.set_branch(&branch, &hash)?;
                Some(branch)
            }
            Head::Detached(_) => {
                self.refs.detach_head(&hash)?;
                None
            }
            Head::Unborn => return Err(Error::ref_not_found("HEAD")),
        };

        index.clear();
        self.save_index(&index)?;

        Ok(CommitOutcome::Created {
            hash,
            branch,
            files,
        })
    }

    /// Walk the first-parent chain from HEAD.
    ///
    /// The walk stops at a root commit, at an unloadable commit, or on a
    /// revisit (malformed histories must not loop forever).
    pub fn log(&self) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        let mut visited = std::collections::HashSet::new();

        let mut current = self.head_commit()?;
        while let Some(hash) = current {
            if !visited.insert(hash) {
                break;
            }
            let Ok(commit) = self.load_commit(&hash) else {
                break;
            };
            current = commit.parents.first().copied();
            entries.push(LogEntry {
                hash,
                message: commit.message,
                author: commit.author,
                timestamp: commit.timestamp,
                parents: commit.parents,
            });
        }

        Ok(entries)
    }

    /// Create a branch pointing at the current HEAD commit.
    pub fn create_branch(&self, name: &str) -> Result<Hash> {
        RefStore::validate_name(name)?;
        if self.refs.branch(name)?.is_some() {
            return Err(Error::branch_exists(name));
        }
        let hash = self.head_commit()?.ok_or(Error::UnbornHead)?;
        self.refs.set_branch(name, &hash)?;
        Ok(hash)
    }

    /// Delete a branch (never the one HEAD is attached to).
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.refs.delete_branch(name)
    }

    /// Classify the working tree against HEAD and the index.
    pub fn status(&self) -> Result<Status> {
        let head = self.refs.read_head()?;
        let head_snapshot = self.head_snapshot()?;
        let index = self.load_index()?;
        let tree = worktree::snapshot(&self.working_dir)?;
        let report = classify(&index, &head_snapshot, &tree);
        Ok(Status { head, report })
    }

    /// Error with `WouldOverwrite` unless the working tree is clean with
    /// respect to HEAD and the index.
    pub(crate) fn ensure_clean(&self) -> Result<()> {
        let status = self.status()?;
        if status.report.has_unstaged_changes() {
            return Err(Error::would_overwrite(status.report.dirty_paths()));
        }
        Ok(())
    }
}

/// Local time in the commit-header format.
pub(crate) fn current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(repo: &Repository, rel: &str, content: &[u8]) {
        let path = worktree::join_rel(repo.working_dir(), rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn init_repo(dir: &TempDir) -> Repository {
        let (repo, created) = Repository::init(dir.path()).unwrap();
        assert!(created);
        repo
    }

    #[test]
    fn test_init_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        let root = temp_dir.path();
        assert!(root.join(".minigit/objects").is_dir());
        assert!(root.join(".minigit/refs/heads").is_dir());
        assert!(root.join(".minigit/index").is_file());
        assert_eq!(
            fs::read_to_string(root.join(".minigit/HEAD")).unwrap(),
            "ref: refs/heads/master"
        );
        assert_eq!(
            fs::read_to_string(root.join(".gitignore")).unwrap(),
            ".minigit/\n"
        );

        // HEAD attached to unborn master
        assert_eq!(
            repo.refs().read_head().unwrap(),
            Head::Attached {
                branch: "master".to_string()
            }
        );
        assert_eq!(repo.head_commit().unwrap(), None);
    }

    #[test]
    fn test_init_twice_reports_existing() {
        let temp_dir = TempDir::new().unwrap();
        init_repo(&temp_dir);

        let (_, created) = Repository::init(temp_dir.path()).unwrap();
        assert!(!created);
    }

    #[test]
    fn test_open_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        init_repo(&temp_dir);

        let nested = temp_dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::open(&nested).unwrap();
        assert_eq!(repo.working_dir(), temp_dir.path());
    }

    #[test]
    fn test_open_outside_repository() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            Repository::open(temp_dir.path()),
            Err(Error::NotARepository { .. })
        ));
    }

    #[test]
    fn test_add_missing_file_stages_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        write_file(&repo, "present.txt", b"here");

        let result = repo.add(&["present.txt".to_string(), "absent.txt".to_string()]);
        assert!(matches!(result, Err(Error::FileNotFound { .. })));
        assert!(repo.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_first_commit_scenario() {
        // S1: init; write a.txt; add; commit
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        write_file(&repo, "a.txt", b"hello\n");

        repo.add(&["a.txt".to_string()]).unwrap();
        let outcome = repo.commit("first", "Anonymous").unwrap();

        let CommitOutcome::Created {
            hash,
            branch,
            files,
        } = outcome
        else {
            panic!("expected a commit");
        };
        assert_eq!(branch.as_deref(), Some("master"));
        assert_eq!(files, 1);

        // refs/heads/master points at the new commit, HEAD stays symbolic
        assert_eq!(
            repo.refs().branch("master").unwrap(),
            Some(BranchTip::At(hash))
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(".minigit/HEAD")).unwrap(),
            "ref: refs/heads/master"
        );

        // snapshot maps a.txt to the digest of its content
        let commit = repo.load_commit(&hash).unwrap();
        assert_eq!(
            commit.snapshot.get("a.txt"),
            Some(&Hash::hash_bytes(b"hello\n"))
        );
        assert!(commit.parents.is_empty());

        // index cleared
        assert!(repo.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_commit_empty_index() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        assert_eq!(
            repo.commit("nothing", "Anonymous").unwrap(),
            CommitOutcome::NothingToCommit
        );
    }

    #[test]
    fn test_commit_carries_untouched_files_forward() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        write_file(&repo, "a.txt", b"a");
        write_file(&repo, "b.txt", b"b");
        repo.add(&["a.txt".to_string(), "b.txt".to_string()]).unwrap();
        repo.commit("both", "Anonymous").unwrap();

        // Touch only b; a must still be in the next snapshot
        write_file(&repo, "b.txt", b"b2");
        repo.add(&["b.txt".to_string()]).unwrap();
        let CommitOutcome::Created { hash, .. } = repo.commit("update b", "Anonymous").unwrap()
        else {
            panic!("expected a commit");
        };

        let snapshot = repo.load_commit(&hash).unwrap().snapshot;
        assert_eq!(snapshot.get("a.txt"), Some(&Hash::hash_bytes(b"a")));
        assert_eq!(snapshot.get("b.txt"), Some(&Hash::hash_bytes(b"b2")));
    }

    #[test]
    fn test_commit_applies_removals() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        write_file(&repo, "a.txt", b"a");
        write_file(&repo, "b.txt", b"b");
        repo.add(&["a.txt".to_string(), "b.txt".to_string()]).unwrap();
        repo.commit("both", "Anonymous").unwrap();

        repo.remove(&["b.txt".to_string()]).unwrap();
        let CommitOutcome::Created { hash, .. } = repo.commit("drop b", "Anonymous").unwrap()
        else {
            panic!("expected a commit");
        };

        let snapshot = repo.load_commit(&hash).unwrap().snapshot;
        assert!(snapshot.contains_key("a.txt"));
        assert!(!snapshot.contains_key("b.txt"));
    }

    #[test]
    fn test_commit_chain_links_parents() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        write_file(&repo, "a.txt", b"one");
        repo.add(&["a.txt".to_string()]).unwrap();
        let CommitOutcome::Created { hash: first, .. } =
            repo.commit("one", "Anonymous").unwrap()
        else {
            panic!();
        };

        write_file(&repo, "a.txt", b"two");
        repo.add(&["a.txt".to_string()]).unwrap();
        let CommitOutcome::Created { hash: second, .. } =
            repo.commit("two", "Anonymous").unwrap()
        else {
            panic!();
        };

        assert_eq!(repo.load_commit(&second).unwrap().parents, vec![first]);

        let log = repo.log().unwrap();
        let messages: Vec<&str> = log.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "one"]);
        assert_eq!(log[0].hash, second);
    }

    #[test]
    fn test_log_empty_repository() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        assert!(repo.log().unwrap().is_empty());
    }

    #[test]
    fn test_create_branch_at_head() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        write_file(&repo, "a.txt", b"a");
        repo.add(&["a.txt".to_string()]).unwrap();
        let CommitOutcome::Created { hash, .. } = repo.commit("c", "Anonymous").unwrap() else {
            panic!();
        };

        assert_eq!(repo.create_branch("feature").unwrap(), hash);
        assert_eq!(
            repo.refs().branch("feature").unwrap(),
            Some(BranchTip::At(hash))
        );
    }

    #[test]
    fn test_create_branch_errors() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        // Unborn HEAD
        assert!(matches!(
            repo.create_branch("feature"),
            Err(Error::UnbornHead)
        ));

        write_file(&repo, "a.txt", b"a");
        repo.add(&["a.txt".to_string()]).unwrap();
        repo.commit("c", "Anonymous").unwrap();

        assert!(matches!(
            repo.create_branch("bad name"),
            Err(Error::InvalidName { .. })
        ));

        repo.create_branch("taken").unwrap();
        assert!(matches!(
            repo.create_branch("taken"),
            Err(Error::BranchExists { .. })
        ));
    }

    #[test]
    fn test_status_reports_position_and_buckets() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        write_file(&repo, "a.txt", b"a");
        repo.add(&["a.txt".to_string()]).unwrap();
        repo.commit("c", "Anonymous").unwrap();

        write_file(&repo, "a.txt", b"edited");
        write_file(&repo, "stray.txt", b"s");

        let status = repo.status().unwrap();
        assert_eq!(
            status.head,
            Head::Attached {
                branch: "master".to_string()
            }
        );
        assert_eq!(status.report.unstaged_modified, vec!["a.txt"]);
        assert_eq!(status.report.untracked, vec!["stray.txt"]);
        assert!(status.report.has_unstaged_changes());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = current_timestamp();
        // YYYY-MM-DD HH:MM:SS, local time, no timezone suffix
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], " ");
        assert_eq!(&ts[13..14], ":");
    }
}
