//! The staging area (index): the pending next snapshot.

use crate::error::Result;
use crate::hash::Hash;
use crate::store::atomic_write;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Pending additions and deletions layered over HEAD's snapshot.
///
/// `staged` and `removed` are kept disjoint: staging a path clears any
/// pending removal, and marking a path removed drops it from `staged`.
///
/// Persisted line-based at `.minigit/index`:
///
/// ```text
/// staged <digest> <path>
/// removed <path>
/// ```
///
/// The path is the trailing field in both forms, so paths may contain
/// spaces. Malformed lines are ignored on load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingArea {
    staged: BTreeMap<String, Hash>,
    removed: BTreeSet<String>,
}

impl StagingArea {
    /// Load the staging area from its index file; absent file means empty.
    pub fn load(path: &Path) -> Result<Self> {
        let mut area = Self::default();
        if !path.exists() {
            return Ok(area);
        }

        let content = fs::read_to_string(path)?;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("staged ") {
                if let Some((hash_hex, file)) = rest.split_once(' ')
                    && let Ok(hash) = Hash::from_hex(hash_hex)
                    && !file.is_empty()
                {
                    area.staged.insert(file.to_string(), hash);
                }
            } else if let Some(file) = line.strip_prefix("removed ")
                && !file.is_empty()
            {
                area.removed.insert(file.to_string());
            }
        }

        Ok(area)
    }

    /// Persist the staging area to its index file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        for (file, hash) in &self.staged {
            out.push_str("staged ");
            out.push_str(&hash.to_hex());
            out.push(' ');
            out.push_str(file);
            out.push('\n');
        }
        for file in &self.removed {
            out.push_str("removed ");
            out.push_str(file);
            out.push('\n');
        }
        atomic_write(path, out.as_bytes())
    }

    /// Record a path's intended next content, clearing any pending removal.
    pub fn stage(&mut self, path: String, hash: Hash) {
        self.removed.remove(&path);
        self.staged.insert(path, hash);
    }

    /// Mark a path for deletion in the next commit, unstaging it if staged.
    pub fn mark_removed(&mut self, path: &str) {
        self.staged.remove(path);
        self.removed.insert(path.to_string());
    }

    /// Empty both collections.
    pub fn clear(&mut self) {
        self.staged.clear();
        self.removed.clear();
    }

    /// True when nothing is staged and nothing is marked removed.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.removed.is_empty()
    }

    /// Paths with pending content, and what that content will be.
    pub fn staged_files(&self) -> &BTreeMap<String, Hash> {
        &self.staged
    }

    /// Paths marked for deletion.
    pub fn removed_files(&self) -> &BTreeSet<String> {
        &self.removed
    }

    /// Derive the snapshot the next commit must record: HEAD's snapshot
    /// overlaid with `staged`, minus `removed`.
    ///
    /// Untouched files carry over from HEAD, so a commit never silently
    /// drops paths that were not re-staged.
    pub fn snapshot_for_commit(
        &self,
        head_snapshot: &BTreeMap<String, Hash>,
    ) -> BTreeMap<String, Hash> {
        let mut snapshot = head_snapshot.clone();
        for (path, hash) in &self.staged {
            snapshot.insert(path.clone(), *hash);
        }
        for path in &self.removed {
            snapshot.remove(path);
        }
        snapshot
    }
}
