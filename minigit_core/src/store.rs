//! Content-addressed object storage.

use crate::error::{Error, Result};
use crate::hash::Hash;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write bytes to `path` atomically via a sibling temp file and rename.
///
/// A crash mid-write leaves either the old content or nothing; a partial
/// file is never observable under the final name.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::invalid_path(format!("no parent directory: {}", path.display())))?;
    fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(bytes)?;
    temp_file.flush()?;
    temp_file.persist(path)?;

    Ok(())
}

/// A flat content-addressed object store.
///
/// Each entry's filename is the hex digest of its contents; the contents are
/// the raw bytes of a blob or a serialized commit body. The two kinds are
/// not distinguished on disk - disambiguation is by the referring pointer.
#[derive(Debug)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Create a store rooted at the given objects directory.
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get the path of the object file for a hash.
    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        self.root.join(hash.to_hex())
    }

    /// Store bytes, returning their content hash.
    ///
    /// Idempotent: storing the same content twice writes once. Concurrent
    /// writers of the same content are safe because both produce identical
    /// bytes under the same name.
    pub fn put(&self, bytes: &[u8]) -> Result<Hash> {
        let hash = Hash::hash_bytes(bytes);

        let obj_path = self.object_path(&hash);
        if obj_path.exists() {
            return Ok(hash);
        }

        atomic_write(&obj_path, bytes)?;
        Ok(hash)
    }

    /// Retrieve the bytes stored under a hash.
    ///
    /// Re-hashes the bytes on the way out so on-disk corruption is detected
    /// rather than propagated.
    pub fn get(&self, hash: &Hash) -> Result<Vec<u8>> {
        let obj_path = self.object_path(hash);

        if !obj_path.exists() {
            return Err(Error::object_not_found(hash.to_hex()));
        }

        let bytes = fs::read(&obj_path)?;

        let computed = Hash::hash_bytes(&bytes);
        if computed != *hash {
            return Err(Error::corrupt_object(
                hash.to_hex(),
                format!("content hashes to {}", computed.to_hex()),
            ));
        }

        Ok(bytes)
    }

    /// Check whether an object exists.
    pub fn exists(&self, hash: &Hash) -> bool {
        self.object_path(hash).exists()
    }
}
