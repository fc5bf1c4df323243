//! # minigit core
//!
//! A miniature version-control engine: project history is a DAG of
//! immutable snapshots backed by a content-addressed object store.
//!
//! ## Features
//!
//! - Content-addressed blob and commit storage (BLAKE3, flat object dir)
//! - Branch refs and a symbolic/detached HEAD
//! - A persistent staging area layered over HEAD's snapshot
//! - Working-tree status classification with a would-overwrite safety gate
//! - Ancestry queries (BFS ancestor test, depth-minimizing merge base)
//! - Checkout with crash-recoverable mutation ordering
//! - Fast-forward and three-way merge with conflict markers
//!
//! ## Example
//!
//! ```no_run
//! use minigit_core::Repository;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (repo, _created) = Repository::init("./project")?;
//!
//! std::fs::write("./project/a.txt", "hello\n")?;
//! repo.add(&["a.txt".to_string()])?;
//! repo.commit("first", "Anonymous")?;
//!
//! repo.create_branch("feature")?;
//! repo.checkout("feature")?;
//! # Ok(())
//! # }
//! ```

mod ancestry;
mod checkout;
mod commit;
mod error;
mod hash;
mod index;
mod merge;
mod refs;
mod repo;
mod status;
mod store;
mod worktree;

pub use ancestry::{find_lca, is_ancestor};
pub use checkout::CheckoutOutcome;
pub use commit::Commit;
pub use error::{Error, Result};
pub use hash::{HASH_SIZE, Hash};
pub use index::StagingArea;
pub use merge::MergeOutcome;
pub use refs::{BranchTip, Head, RefStore};
pub use repo::{CommitOutcome, DEFAULT_BRANCH, LogEntry, Repository, Status};
pub use status::{StatusReport, classify};
pub use store::ObjectStore;
pub use worktree::{IGNORE_MANIFEST, METADATA_DIR, enumerate, materialize, snapshot};
