//! Error types for minigit_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using minigit_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during repository operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// No `.minigit` directory at or above the given path.
    #[error("not a minigit repository (or any of the parent directories): {path}")]
    NotARepository { path: PathBuf },

    /// Invalid hash format or encoding.
    #[error("invalid hash: {reason}")]
    InvalidHash { reason: String },

    /// A working-tree path that cannot be represented or staged.
    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },

    /// A file named on the command line does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Object not found in the store.
    #[error("object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// Stored bytes no longer match their content address.
    #[error("corrupt object {hash}: {reason}")]
    CorruptObject { hash: String, reason: String },

    /// Commit body cannot be parsed, or it references a missing blob.
    #[error("corrupt commit {hash}: {reason}")]
    CorruptCommit { hash: String, reason: String },

    /// A commit field violates the wire format before persistence.
    #[error("invalid commit: {reason}")]
    InvalidCommit { reason: String },

    /// Branch-name rule violation.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// `branch` collision.
    #[error("a branch named '{name}' already exists")]
    BranchExists { name: String },

    /// Refusing to delete the branch HEAD is attached to.
    #[error("cannot delete branch '{name}' while it is checked out")]
    BranchCheckedOut { name: String },

    /// Checkout/merge target cannot be resolved.
    #[error("reference not found: {name}")]
    RefNotFound { name: String },

    /// Operation requires a commit on HEAD.
    #[error("current branch has no commits yet")]
    UnbornHead,

    /// The safety gate tripped on checkout or merge.
    #[error("local changes to {} path(s) would be overwritten; commit or discard them first", .paths.len())]
    WouldOverwrite { paths: Vec<String> },

    /// Merge cannot find a base commit.
    #[error("no common ancestor between the histories being merged")]
    NoCommonAncestor,

    /// Merge invoked from a detached HEAD.
    #[error("cannot merge while HEAD is detached")]
    CannotMergeDetached,

    /// Three-way merge left conflicts in the working tree.
    #[error("merge conflict in {} path(s)", .paths.len())]
    MergeConflict { paths: Vec<String> },
}

impl Error {
    /// Create a NotARepository error.
    pub fn not_a_repository(path: impl Into<PathBuf>) -> Self {
        Error::NotARepository { path: path.into() }
    }

    /// Create an InvalidHash error.
    pub fn invalid_hash(reason: impl Into<String>) -> Self {
        Error::InvalidHash {
            reason: reason.into(),
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an ObjectNotFound error.
    pub fn object_not_found(hash: impl Into<String>) -> Self {
        Error::ObjectNotFound { hash: hash.into() }
    }

    /// Create a CorruptObject error.
    pub fn corrupt_object(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptObject {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create a CorruptCommit error.
    pub fn corrupt_commit(hash: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CorruptCommit {
            hash: hash.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidCommit error.
    pub fn invalid_commit(reason: impl Into<String>) -> Self {
        Error::InvalidCommit {
            reason: reason.into(),
        }
    }

    /// Create an InvalidName error.
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a BranchExists error.
    pub fn branch_exists(name: impl Into<String>) -> Self {
        Error::BranchExists { name: name.into() }
    }

    /// Create a BranchCheckedOut error.
    pub fn branch_checked_out(name: impl Into<String>) -> Self {
        Error::BranchCheckedOut { name: name.into() }
    }

    /// Create a RefNotFound error.
    pub fn ref_not_found(name: impl Into<String>) -> Self {
        Error::RefNotFound { name: name.into() }
    }

    /// Create a WouldOverwrite error.
    pub fn would_overwrite(paths: Vec<String>) -> Self {
        Error::WouldOverwrite { paths }
    }

    /// Create a MergeConflict error.
    pub fn merge_conflict(paths: Vec<String>) -> Self {
        Error::MergeConflict { paths }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
