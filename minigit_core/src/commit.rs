//! Commit records and their wire format.

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::store::ObjectStore;
use std::collections::BTreeMap;

/// An immutable commit: headers, parentage, and a whole-project snapshot.
///
/// The snapshot maps working-tree-relative paths (forward-slash separated)
/// to blob hashes. A sorted map keeps the serialized body canonical, so
/// structurally equal commits always hash to the same identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Single-line commit message.
    pub message: String,
    /// Single-line author name.
    pub author: String,
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Zero or more parent commit hashes. Zero = root, one = normal,
    /// two = merge. The format tolerates more; nothing here produces them.
    pub parents: Vec<Hash>,
    /// Path to blob hash.
    pub snapshot: BTreeMap<String, Hash>,
}

impl Commit {
    /// Create a commit, validating that the header fields fit on one line.
    pub fn new(
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp: impl Into<String>,
        parents: Vec<Hash>,
        snapshot: BTreeMap<String, Hash>,
    ) -> Result<Self> {
        let message = message.into();
        let author = author.into();
        let timestamp = timestamp.into();

        if message.contains('\n') {
            return Err(Error::invalid_commit("message must not contain a newline"));
        }
        if author.contains('\n') {
            return Err(Error::invalid_commit("author must not contain a newline"));
        }
        if timestamp.contains('\n') {
            return Err(Error::invalid_commit("timestamp must not contain a newline"));
        }
        for path in snapshot.keys() {
            validate_path(path)?;
        }

        Ok(Self {
            message,
            author,
            timestamp,
            parents,
            snapshot,
        })
    }

    /// Serialize the commit body.
    ///
    /// Format (byte-exact, UTF-8, newline-delimited):
    ///
    /// ```text
    /// <message>\n
    /// <author>\n
    /// <timestamp>\n
    /// <parent1> <parent2> ...\n     (empty line if no parents)
    /// <path1> <blob1>\n
    /// ...
    /// ```
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = String::new();

        out.push_str(&self.message);
        out.push('\n');
        out.push_str(&self.author);
        out.push('\n');
        out.push_str(&self.timestamp);
        out.push('\n');

        let parents: Vec<String> = self.parents.iter().map(Hash::to_hex).collect();
        out.push_str(&parents.join(" "));
        out.push('\n');

        for (path, blob) in &self.snapshot {
            out.push_str(path);
            out.push(' ');
            out.push_str(&blob.to_hex());
            out.push('\n');
        }

        out.into_bytes()
    }

    /// The commit's identity: the hash of its full serialized body.
    ///
    /// Never a subset of headers - commits with equal headers but different
    /// snapshots must not collide.
    pub fn digest(&self) -> Hash {
        Hash::hash_bytes(&self.serialize())
    }

    /// Parse a commit body.
    ///
    /// The first three lines are the headers verbatim. The fourth line is
    /// whitespace-split into parent hashes. Each remaining non-empty line is
    /// split at its last space: the digest is the final field and contains
    /// no spaces, so paths themselves may.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let identity = Hash::hash_bytes(bytes);
        let corrupt = |reason: String| Error::corrupt_commit(identity.to_hex(), reason);

        let text = std::str::from_utf8(bytes)
            .map_err(|e| corrupt(format!("body is not valid UTF-8: {}", e)))?;

        let mut lines = text.split('\n');
        let message = lines
            .next()
            .ok_or_else(|| corrupt("missing message line".into()))?;
        let author = lines
            .next()
            .ok_or_else(|| corrupt("missing author line".into()))?;
        let timestamp = lines
            .next()
            .ok_or_else(|| corrupt("missing timestamp line".into()))?;
        let parents_line = lines
            .next()
            .ok_or_else(|| corrupt("missing parents line".into()))?;

        let mut parents = Vec::new();
        for token in parents_line.split_whitespace() {
            let parent = Hash::from_hex(token)
                .map_err(|e| corrupt(format!("bad parent hash '{}': {}", token, e)))?;
            parents.push(parent);
        }

        let mut snapshot = BTreeMap::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let (path, blob_hex) = line
                .rsplit_once(' ')
                .ok_or_else(|| corrupt(format!("snapshot line without separator: '{}'", line)))?;
            validate_path(path)
                .map_err(|e| corrupt(format!("bad snapshot path '{}': {}", path, e)))?;
            let blob = Hash::from_hex(blob_hex)
                .map_err(|e| corrupt(format!("bad blob hash '{}': {}", blob_hex, e)))?;
            snapshot.insert(path.to_string(), blob);
        }

        Ok(Self {
            message: message.to_string(),
            author: author.to_string(),
            timestamp: timestamp.to_string(),
            parents,
            snapshot,
        })
    }

    /// Load and parse the commit stored under `hash`.
    pub fn load(store: &ObjectStore, hash: &Hash) -> Result<Self> {
        let bytes = store.get(hash)?;
        Self::parse(&bytes)
    }
}

/// Validate a snapshot path: relative, non-empty, no traversal above the
/// working root.
pub(crate) fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path("path is empty"));
    }
    if path.starts_with('/') {
        return Err(Error::invalid_path(format!("path is absolute: {}", path)));
    }
    if path.contains('\n') {
        return Err(Error::invalid_path(format!(
            "path contains a newline: {:?}",
            path
        )));
    }
    for component in path.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(Error::invalid_path(format!(
                "path component '{}' not allowed: {}",
                component, path
            )));
        }
    }
    Ok(())
}
