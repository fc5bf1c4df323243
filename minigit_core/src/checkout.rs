//! The checkout engine.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::refs::{BranchTip, RefStore};
use crate::repo::Repository;
use crate::worktree;

/// How a checkout target resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// HEAD attached to a branch.
    Branch { name: String, hash: Hash },
    /// HEAD detached onto a commit.
    Detached { hash: Hash },
}

impl Repository {
    /// Replace the working tree with a target snapshot.
    ///
    /// The target resolves as a branch name first, then as a commit hash
    /// present in the object store; anything else is `RefNotFound`.
    ///
    /// Nothing mutates until the safety gate has passed and the target
    /// commit's blobs have all been verified present. The mutation order
    /// after that is fixed for crash recoverability: reset the tracked
    /// area, materialize, update HEAD, clear the index. Blobs are immutable
    /// and content-addressed, so re-running an interrupted checkout
    /// converges on the target state.
    pub fn checkout(&self, target: &str) -> Result<CheckoutOutcome> {
        self.ensure_clean()?;

        let outcome = self.resolve_checkout_target(target)?;
        let target_hash = match &outcome {
            CheckoutOutcome::Branch { hash, .. } => *hash,
            CheckoutOutcome::Detached { hash } => *hash,
        };

        // Verify the whole snapshot is materializable before touching
        // anything.
        let commit = self.load_commit(&target_hash)?;
        for (path, blob) in &commit.snapshot {
            if !self.store().exists(blob) {
                return Err(Error::corrupt_commit(
                    target_hash.to_hex(),
                    format!("dangling blob {} for {}", blob.to_hex(), path),
                ));
            }
        }

        worktree::clear_tracked(self.working_dir())?;
        worktree::materialize(self.working_dir(), &commit.snapshot, self.store())?;

        match &outcome {
            CheckoutOutcome::Branch { name, .. } => self.refs().attach_head(name)?,
            CheckoutOutcome::Detached { hash } => self.refs().detach_head(hash)?,
        }

        let mut index = self.load_index()?;
        index.clear();
        self.save_index(&index)?;

        Ok(outcome)
    }

    fn resolve_checkout_target(&self, target: &str) -> Result<CheckoutOutcome> {
        if RefStore::validate_name(target).is_ok() {
            match self.refs().branch(target)? {
                Some(BranchTip::At(hash)) => {
                    return Ok(CheckoutOutcome::Branch {
                        name: target.to_string(),
                        hash,
                    });
                }
                Some(BranchTip::Unborn) => return Err(Error::UnbornHead),
                None => {}
            }
        }

        if let Ok(hash) = Hash::from_hex(target)
            && self.store().exists(&hash)
        {
            return Ok(CheckoutOutcome::Detached { hash });
        }

        Err(Error::ref_not_found(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refs::Head;
    use crate::repo::CommitOutcome;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(repo: &Repository, rel: &str, content: &[u8]) {
        let path = worktree::join_rel(repo.working_dir(), rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn commit_file(repo: &Repository, rel: &str, content: &[u8], message: &str) -> Hash {
        write_file(repo, rel, content);
        repo.add(&[rel.to_string()]).unwrap();
        match repo.commit(message, "Anonymous").unwrap() {
            CommitOutcome::Created { hash, .. } => hash,
            CommitOutcome::NothingToCommit => panic!("nothing to commit"),
        }
    }

    fn init_repo(dir: &TempDir) -> Repository {
        Repository::init(dir.path()).unwrap().0
    }

    #[test]
    fn test_branch_and_diverge_scenario() {
        // S2: branch feature, change a.txt on it, checkout master reverts
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        commit_file(&repo, "a.txt", b"hello\n", "first");
        repo.create_branch("feature").unwrap();
        repo.checkout("feature").unwrap();

        commit_file(&repo, "a.txt", b"hello\nworld\n", "on feature");

        repo.checkout("master").unwrap();
        assert_eq!(
            fs::read(temp_dir.path().join("a.txt")).unwrap(),
            b"hello\n"
        );
        assert_eq!(
            repo.refs().read_head().unwrap(),
            Head::Attached {
                branch: "master".to_string()
            }
        );
    }

    #[test]
    fn test_checkout_removes_files_absent_from_target() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        commit_file(&repo, "a.txt", b"a", "base");
        repo.create_branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        commit_file(&repo, "extra.txt", b"x", "add extra");

        repo.checkout("master").unwrap();
        assert!(!temp_dir.path().join("extra.txt").exists());
        assert!(temp_dir.path().join("a.txt").exists());
    }

    #[test]
    fn test_checkout_detached() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        let first = commit_file(&repo, "a.txt", b"one", "one");
        commit_file(&repo, "a.txt", b"two", "two");

        let outcome = repo.checkout(&first.to_hex()).unwrap();
        assert_eq!(outcome, CheckoutOutcome::Detached { hash: first });
        assert_eq!(repo.refs().read_head().unwrap(), Head::Detached(first));
        assert_eq!(fs::read(temp_dir.path().join("a.txt")).unwrap(), b"one");
    }

    #[test]
    fn test_checkout_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        commit_file(&repo, "a.txt", b"base", "base");
        repo.create_branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        commit_file(&repo, "b.txt", b"extra", "extra");

        repo.checkout("master").unwrap();
        let tree_after_first = worktree::snapshot(repo.working_dir()).unwrap();
        let head_after_first = repo.refs().read_head().unwrap();
        let objects_before: Vec<_> = fs::read_dir(temp_dir.path().join(".minigit/objects"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();

        repo.checkout("master").unwrap();
        assert_eq!(worktree::snapshot(repo.working_dir()).unwrap(), tree_after_first);
        assert_eq!(repo.refs().read_head().unwrap(), head_after_first);

        // No blob writes on the second run
        let objects_after: Vec<_> = fs::read_dir(temp_dir.path().join(".minigit/objects"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(objects_before.len(), objects_after.len());
    }

    #[test]
    fn test_safety_gate_blocks_and_mutates_nothing() {
        // S6: unstaged edit to a.txt, checkout must refuse untouched
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        commit_file(&repo, "a.txt", b"hello\n", "first");
        repo.create_branch("feature").unwrap();
        repo.checkout("feature").unwrap();
        commit_file(&repo, "a.txt", b"feature version\n", "feature edit");
        repo.checkout("master").unwrap();

        // Dirty the working tree without staging
        write_file(&repo, "a.txt", b"local edit\n");
        let head_before = fs::read(temp_dir.path().join(".minigit/HEAD")).unwrap();
        let index_before = fs::read(temp_dir.path().join(".minigit/index")).unwrap();

        let result = repo.checkout("feature");
        assert!(matches!(result, Err(Error::WouldOverwrite { .. })));

        // Working tree, HEAD, and index byte-identical
        assert_eq!(
            fs::read(temp_dir.path().join("a.txt")).unwrap(),
            b"local edit\n"
        );
        assert_eq!(
            fs::read(temp_dir.path().join(".minigit/HEAD")).unwrap(),
            head_before
        );
        assert_eq!(
            fs::read(temp_dir.path().join(".minigit/index")).unwrap(),
            index_before
        );
    }

    #[test]
    fn test_checkout_clears_index() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        commit_file(&repo, "a.txt", b"a", "base");
        repo.create_branch("feature").unwrap();

        // Stage a change, then check out; staged content is already safe in
        // the object store, and the gate does not consider it dirty.
        write_file(&repo, "a.txt", b"staged edit");
        repo.add(&["a.txt".to_string()]).unwrap();
        repo.checkout("feature").unwrap();

        assert!(repo.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_checkout_unknown_ref() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        commit_file(&repo, "a.txt", b"a", "base");

        assert!(matches!(
            repo.checkout("no-such-ref"),
            Err(Error::RefNotFound { .. })
        ));
    }

    #[test]
    fn test_checkout_dangling_blob_is_corrupt_commit() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);
        commit_file(&repo, "a.txt", b"a", "base");

        // Hand-craft a commit referencing a blob that was never stored
        let mut snapshot = BTreeMap::new();
        snapshot.insert("ghost.txt".to_string(), Hash::hash_bytes(b"not stored"));
        let commit = crate::commit::Commit::new(
            "broken",
            "Anonymous",
            "2026-08-02 12:00:00",
            vec![],
            snapshot,
        )
        .unwrap();
        let hash = repo.store().put(&commit.serialize()).unwrap();

        let tree_before = worktree::snapshot(repo.working_dir()).unwrap();
        let result = repo.checkout(&hash.to_hex());
        assert!(matches!(result, Err(Error::CorruptCommit { .. })));
        // No mutation
        assert_eq!(worktree::snapshot(repo.working_dir()).unwrap(), tree_before);
    }

    #[test]
    fn test_checkout_branch_wins_over_hash() {
        let temp_dir = TempDir::new().unwrap();
        let repo = init_repo(&temp_dir);

        let first = commit_file(&repo, "a.txt", b"one", "one");
        commit_file(&repo, "a.txt", b"two", "two");

        // A branch whose name happens to be a full hex hash of a commit
        let alias = first.to_hex();
        let head = repo.head_commit().unwrap().unwrap();
        repo.refs().set_branch(&alias, &head).unwrap();

        let outcome = repo.checkout(&alias).unwrap();
        assert_eq!(
            outcome,
            CheckoutOutcome::Branch {
                name: alias,
                hash: head
            }
        );
    }
}
