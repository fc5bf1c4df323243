//! Working-tree diff and status classification.

use crate::hash::Hash;
use crate::index::StagingArea;
use crate::worktree::IGNORE_MANIFEST;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Bucketed comparison of index, HEAD snapshot, and working tree.
///
/// Every path lands in exactly one bucket. Paths are sorted within each
/// bucket. The ignore manifest never appears under `untracked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Staged, absent from HEAD.
    pub staged_new: Vec<String>,
    /// Staged with content differing from HEAD.
    pub staged_modified: Vec<String>,
    /// Marked for deletion in the next commit.
    pub staged_deleted: Vec<String>,
    /// Tracked, unstaged, working copy differs from HEAD.
    pub unstaged_modified: Vec<String>,
    /// Tracked, missing from the working tree, not marked removed.
    pub unstaged_deleted: Vec<String>,
    /// Staged, but the working copy has moved on since staging.
    pub index_stale: Vec<String>,
    /// Present only in the working tree.
    pub untracked: Vec<String>,
    /// Tracked and identical everywhere.
    pub clean: Vec<String>,
}

impl StatusReport {
    /// The safety predicate gating checkout and merge: true when any
    /// working-tree state would be lost by a hard reset.
    pub fn has_unstaged_changes(&self) -> bool {
        !self.unstaged_modified.is_empty()
            || !self.unstaged_deleted.is_empty()
            || !self.index_stale.is_empty()
            || !self.untracked.is_empty()
    }

    /// The paths that trip the safety predicate, sorted.
    pub fn dirty_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .unstaged_modified
            .iter()
            .chain(&self.unstaged_deleted)
            .chain(&self.index_stale)
            .chain(&self.untracked)
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

/// Classify every path across index, HEAD snapshot, and working tree.
///
/// Bucket precedence for staged paths: a pending removal wins, then a
/// working-copy divergence from the staged content (`index_stale`), then
/// the comparison against HEAD. A path staged at exactly its HEAD content
/// (as the post-merge re-seed produces) reports clean.
pub fn classify(
    index: &StagingArea,
    head: &BTreeMap<String, Hash>,
    worktree: &BTreeMap<String, Hash>,
) -> StatusReport {
    let mut paths: BTreeSet<&String> = BTreeSet::new();
    paths.extend(head.keys());
    paths.extend(worktree.keys());
    paths.extend(index.staged_files().keys());
    paths.extend(index.removed_files());

    let mut report = StatusReport::default();

    for path in paths {
        let h = head.get(path);
        let w = worktree.get(path);
        let s = index.staged_files().get(path);

        if index.removed_files().contains(path) {
            report.staged_deleted.push(path.clone());
            continue;
        }

        if let Some(staged) = s {
            match w {
                Some(working) if working != staged => {
                    report.index_stale.push(path.clone());
                }
                _ => match h {
                    None => report.staged_new.push(path.clone()),
                    Some(head_hash) if head_hash != staged => {
                        report.staged_modified.push(path.clone());
                    }
                    Some(_) => report.clean.push(path.clone()),
                },
            }
            continue;
        }

        match (w, h) {
            (Some(working), Some(head_hash)) => {
                if working != head_hash {
                    report.unstaged_modified.push(path.clone());
                } else {
                    report.clean.push(path.clone());
                }
            }
            (Some(_), None) => {
                if path != IGNORE_MANIFEST {
                    report.untracked.push(path.clone());
                }
            }
            (None, Some(_)) => report.unstaged_deleted.push(path.clone()),
            (None, None) => {}
        }
    }

    report
}
