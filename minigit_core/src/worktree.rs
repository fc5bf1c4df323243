//! Working-tree enumeration and materialization.

use crate::commit::validate_path;
use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::ObjectStore;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Repository metadata directory name.
pub const METADATA_DIR: &str = ".minigit";

/// Legacy alias also skipped during enumeration.
pub const LEGACY_METADATA_DIR: &str = ".git";

/// The ignore manifest created by `init`; never reported as untracked.
pub const IGNORE_MANIFEST: &str = ".gitignore";

/// True when a relative path's first component is a metadata directory.
fn in_metadata_dir(rel: &Path) -> bool {
    match rel.components().next() {
        Some(component) => {
            let name = component.as_os_str();
            name == METADATA_DIR || name == LEGACY_METADATA_DIR
        }
        None => false,
    }
}

/// Convert a relative path to its forward-slash working-tree form.
fn to_rel_string(rel: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| Error::invalid_path(format!("non-UTF-8 path: {}", rel.display())))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

/// Enumerate every regular file under `root`, as sorted forward-slash paths
/// relative to `root`, skipping anything under the metadata directories.
pub fn enumerate(root: &Path) -> Result<Vec<String>> {
    let root_owned = root.to_path_buf();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .filter_entry(move |entry| {
            entry
                .path()
                .strip_prefix(&root_owned)
                .map(|rel| !in_metadata_dir(rel))
                .unwrap_or(true)
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::invalid_path(format!("outside root: {}", entry.path().display())))?;
        files.push(to_rel_string(rel)?);
    }

    files.sort();
    Ok(files)
}

/// Hash every file in the working tree: path to content hash.
pub fn snapshot(root: &Path) -> Result<BTreeMap<String, Hash>> {
    let mut map = BTreeMap::new();
    for rel in enumerate(root)? {
        let bytes = fs::read(join_rel(root, &rel))?;
        map.insert(rel, Hash::hash_bytes(&bytes));
    }
    Ok(map)
}

/// Join a forward-slash relative path onto `root` component by component.
pub(crate) fn join_rel(root: &Path, rel: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in rel.split('/') {
        path.push(part);
    }
    path
}

/// Remove every top-level entry except the metadata directories.
///
/// This is the hard reset of the tracked area that precedes materializing
/// a snapshot; the working tree is a derived view and may be discarded.
pub fn clear_tracked(root: &Path) -> Result<()> {
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == METADATA_DIR || name == LEGACY_METADATA_DIR {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Write a snapshot's blobs into the working tree, creating parent
/// directories as needed.
///
/// Idempotent: blobs are immutable and content-addressed, so re-running
/// after a partial failure converges on the same tree.
pub fn materialize(
    root: &Path,
    snapshot: &BTreeMap<String, Hash>,
    store: &ObjectStore,
) -> Result<()> {
    for (rel, blob) in snapshot {
        validate_path(rel)?;
        let bytes = store.get(blob)?;
        let dest = join_rel(root, rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes)?;
    }
    Ok(())
}
