//! The merge engine: fast-forward detection and three-way reconciliation.

use crate::ancestry::{find_lca, is_ancestor};
use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::refs::{BranchTip, Head};
use crate::repo::{Repository, current_timestamp};
use crate::worktree;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The current branch already contains the other branch's history.
    AlreadyUpToDate,
    /// The current branch ref moved forward to the other tip; no commit
    /// was created.
    FastForward { branch: String, to: Hash },
    /// A merge commit was created with parents (HEAD, other).
    Merged { branch: String, commit: Hash },
}

/// Per-path three-way decision.
enum Reconciled {
    Keep(Option<Hash>),
    Conflict,
}

/// Reconcile one path given the base (`l`), ours (`c`), and theirs (`o`).
///
/// If both sides agree, keep that; if only one side diverged from the
/// base, take the diverging side (including its deletion). Anything else
/// is a conflict. Additions fall out of the same comparison with the base
/// absent.
fn reconcile(l: Option<&Hash>, c: Option<&Hash>, o: Option<&Hash>) -> Reconciled {
    if c == o {
        Reconciled::Keep(c.copied())
    } else if l == c {
        Reconciled::Keep(o.copied())
    } else if l == o {
        Reconciled::Keep(c.copied())
    } else {
        Reconciled::Conflict
    }
}

impl Repository {
    /// Merge a branch into the current (attached) branch.
    ///
    /// On conflicts the working tree receives conflict-marked files, the
    /// index is re-seeded with the tentative merge, no refs move, and the
    /// error carries the conflicted paths. A clean three-way merge creates
    /// a two-parent commit and advances the current branch.
    pub fn merge(&self, other_branch: &str, author: &str) -> Result<MergeOutcome> {
        let Head::Attached { branch: current } = self.refs().read_head()? else {
            return Err(Error::CannotMergeDetached);
        };

        let ours = match self.refs().branch(&current)? {
            Some(BranchTip::At(hash)) => hash,
            _ => return Err(Error::UnbornHead),
        };
        let theirs = match self.refs().branch(other_branch)? {
            Some(BranchTip::At(hash)) => hash,
            Some(BranchTip::Unborn) => return Err(Error::UnbornHead),
            None => return Err(Error::ref_not_found(other_branch)),
        };

        self.ensure_clean()?;

        if ours == theirs || is_ancestor(self.store(), &theirs, &ours) {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        if is_ancestor(self.store(), &ours, &theirs) {
            return self.fast_forward(&current, &theirs);
        }

        let base = find_lca(self.store(), &ours, &theirs).ok_or(Error::NoCommonAncestor)?;
        self.three_way(&current, other_branch, &base, &ours, &theirs, author)
    }

    /// Advance the current branch to the other tip without a new commit.
    fn fast_forward(&self, branch: &str, to: &Hash) -> Result<MergeOutcome> {
        let target = self.load_commit(to)?;

        self.refs().set_branch(branch, to)?;

        let mut index = self.load_index()?;
        index.clear();
        self.save_index(&index)?;

        worktree::clear_tracked(self.working_dir())?;
        worktree::materialize(self.working_dir(), &target.snapshot, self.store())?;

        Ok(MergeOutcome::FastForward {
            branch: branch.to_string(),
            to: *to,
        })
    }

    fn three_way(
        &self,
        current: &str,
        other_branch: &str,
        base: &Hash,
        ours: &Hash,
        theirs: &Hash,
        author: &str,
    ) -> Result<MergeOutcome> {
        let base_commit = self.load_commit(base)?;
        let our_commit = self.load_commit(ours)?;
        let their_commit = self.load_commit(theirs)?;

        let mut paths: BTreeSet<&String> = BTreeSet::new();
        paths.extend(base_commit.snapshot.keys());
        paths.extend(our_commit.snapshot.keys());
        paths.extend(their_commit.snapshot.keys());

        let mut merged: BTreeMap<String, Hash> = BTreeMap::new();
        let mut conflicts: Vec<String> = Vec::new();

        for path in paths {
            let l = base_commit.snapshot.get(path);
            let c = our_commit.snapshot.get(path);
            let o = their_commit.snapshot.get(path);

            match reconcile(l, c, o) {
                Reconciled::Keep(Some(hash)) => {
                    merged.insert(path.clone(), hash);
                }
                Reconciled::Keep(None) => {}
                Reconciled::Conflict => conflicts.push(path.clone()),
            }
        }

        if !conflicts.is_empty() {
            return self.materialize_conflicts(other_branch, &merged, &conflicts, &our_commit, &their_commit);
        }

        let message = format!("Merge branch '{}' into {}", other_branch, current);
        let commit = Commit::new(
            message,
            author,
            current_timestamp(),
            vec![*ours, *theirs],
            merged.clone(),
        )?;
        let hash = self.store().put(&commit.serialize())?;

        self.refs().set_branch(current, &hash)?;

        worktree::clear_tracked(self.working_dir())?;
        worktree::materialize(self.working_dir(), &merged, self.store())?;

        let mut index = self.load_index()?;
        index.clear();
        for (path, blob) in &merged {
            index.stage(path.clone(), *blob);
        }
        self.save_index(&index)?;

        Ok(MergeOutcome::Merged {
            branch: current.to_string(),
            commit: hash,
        })
    }

    /// Write the tentative merge into the working tree and index: merged
    /// paths at their reconciled content, conflicted paths with markers.
    /// Refs do not move; the caller resolves and commits.
    fn materialize_conflicts(
        &self,
        other_branch: &str,
        merged: &BTreeMap<String, Hash>,
        conflicts: &[String],
        our_commit: &Commit,
        their_commit: &Commit,
    ) -> Result<MergeOutcome> {
        worktree::materialize(self.working_dir(), merged, self.store())?;

        let mut index = self.load_index()?;
        index.clear();
        for (path, blob) in merged {
            index.stage(path.clone(), *blob);
        }

        for path in conflicts {
            let our_bytes = match our_commit.snapshot.get(path) {
                Some(hash) => self.store().get(hash)?,
                None => Vec::new(),
            };
            let their_bytes = match their_commit.snapshot.get(path) {
                Some(hash) => self.store().get(hash)?,
                None => Vec::new(),
            };
            let marked = conflict_file(&our_bytes, &their_bytes, other_branch);

            let dest = worktree::join_rel(self.working_dir(), path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, &marked)?;

            let tentative = self.store().put(&marked)?;
            index.stage(path.clone(), tentative);
        }
        self.save_index(&index)?;

        Err(Error::merge_conflict(conflicts.to_vec()))
    }
}

/// Render a conflicted file: each side's bytes end with exactly one
/// newline before the next marker, and the closing marker names the
/// incoming branch.
fn conflict_file(ours: &[u8], theirs: &[u8], other_branch: &str) -> Vec<u8> {
    fn push_side(buf: &mut Vec<u8>, side: &[u8]) {
        buf.extend_from_slice(side);
        if !side.ends_with(b"\n") {
            buf.push(b'\n');
        }
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(b"<<<<<<< HEAD\n");
    push_side(&mut buf, ours);
    buf.extend_from_slice(b"=======\n");
    push_side(&mut buf, theirs);
    buf.extend_from_slice(format!(">>>>>>> {}\n", other_branch).as_bytes());
    buf
}
