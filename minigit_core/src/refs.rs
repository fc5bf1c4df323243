//! Branch references and the HEAD state machine.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::atomic_write;
use std::fs;
use std::path::PathBuf;

const HEAD_REF_PREFIX: &str = "ref: refs/heads/";

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// Symbolic reference to a branch; the branch itself may be unborn.
    Attached { branch: String },
    /// Direct commit hash (detached HEAD).
    Detached(Hash),
    /// HEAD file missing or empty.
    Unborn,
}

/// The resolved state of a branch that exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchTip {
    /// Branch points at a commit.
    At(Hash),
    /// Branch file exists but records no commit yet.
    Unborn,
}

/// Manages branch refs under `refs/heads/` and the `HEAD` file.
///
/// Every single-ref update is write-to-temp-then-rename, so concurrent
/// writers observe last-writer-wins at single-ref granularity.
#[derive(Debug)]
pub struct RefStore {
    minigit_dir: PathBuf,
}

impl RefStore {
    /// Create a RefStore over the given metadata directory.
    pub(crate) fn new(minigit_dir: PathBuf) -> Self {
        Self { minigit_dir }
    }

    fn heads_dir(&self) -> PathBuf {
        self.minigit_dir.join("refs").join("heads")
    }

    fn head_path(&self) -> PathBuf {
        self.minigit_dir.join("HEAD")
    }

    /// Validate a branch name: non-empty, no whitespace, no slashes.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_name(name, "name is empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(Error::invalid_name(name, "name contains whitespace"));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(Error::invalid_name(name, "name contains a path separator"));
        }
        Ok(())
    }

    fn branch_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.heads_dir().join(name))
    }

    /// Resolve a branch: `None` if it does not exist, `Unborn` if its ref
    /// file records no commit yet.
    pub fn branch(&self, name: &str) -> Result<Option<BranchTip>> {
        let path = self.branch_path(name)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Some(BranchTip::Unborn));
        }

        let hash = Hash::from_hex(trimmed)?;
        Ok(Some(BranchTip::At(hash)))
    }

    /// Create or update a branch to point at a commit.
    pub fn set_branch(&self, name: &str, hash: &Hash) -> Result<()> {
        let path = self.branch_path(name)?;
        atomic_write(&path, hash.to_hex().as_bytes())
    }

    /// Delete a branch.
    ///
    /// Refuses to delete the branch HEAD is attached to.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let path = self.branch_path(name)?;
        if !path.exists() {
            return Err(Error::ref_not_found(name));
        }

        if let Head::Attached { branch } = self.read_head()?
            && branch == name
        {
            return Err(Error::branch_checked_out(name));
        }

        fs::remove_file(&path)?;
        Ok(())
    }

    /// List all born branches as (name, hash) pairs, sorted by name.
    pub fn list_branches(&self) -> Result<Vec<(String, Hash)>> {
        let heads = self.heads_dir();
        let mut branches = Vec::new();

        if !heads.exists() {
            return Ok(branches);
        }

        for entry in fs::read_dir(&heads)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_file()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
                && let Some(BranchTip::At(hash)) = self.branch(name)?
            {
                branches.push((name.to_string(), hash));
            }
        }

        branches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(branches)
    }

    /// Read the current HEAD state.
    pub fn read_head(&self) -> Result<Head> {
        let path = self.head_path();
        if !path.exists() {
            return Ok(Head::Unborn);
        }

        let content = fs::read_to_string(&path)?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Head::Unborn);
        }

        if let Some(branch) = trimmed.strip_prefix(HEAD_REF_PREFIX) {
            return Ok(Head::Attached {
                branch: branch.to_string(),
            });
        }

        let hash = Hash::from_hex(trimmed)?;
        Ok(Head::Detached(hash))
    }

    /// Attach HEAD to a branch.
    pub fn attach_head(&self, branch: &str) -> Result<()> {
        Self::validate_name(branch)?;
        let content = format!("{}{}", HEAD_REF_PREFIX, branch);
        atomic_write(&self.head_path(), content.as_bytes())
    }

    /// Detach HEAD onto a commit.
    pub fn detach_head(&self, hash: &Hash) -> Result<()> {
        atomic_write(&self.head_path(), hash.to_hex().as_bytes())
    }
}
