//! Small filesystem and hashing helpers shared across the crate: JSON I/O,
//! content hashing, and path/source-name normalization.

use crate::error::{DriverError, Result};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Reads and deserializes a JSON file, wrapping I/O and deserialization
/// errors uniformly.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(DriverError::from)
}

/// Serializes `value` as pretty JSON and writes it to `path`, creating any
/// missing parent directories first.
pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    create_parent_dir_all(path)?;
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}

/// Creates `path`'s parent directory tree if it does not already exist.
pub fn create_parent_dir_all(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Hex-encoded SHA-256 content hash, used both as the MDG's per-file content
/// hash and as an ingredient of IMDG cache keys.
pub fn content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    hex::encode(digest)
}

/// Returns the last-modified time of `path` as a `SystemTime`, used by the
/// executor's input-modification detection.
pub fn modified_time(path: &Path) -> Result<std::time::SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

/// Best-effort display-friendly source name for a path: relative to `base`
/// when possible, using forward slashes regardless of platform (mirrors the
/// teacher's `path-slash` usage so cache/record identities are
/// platform-independent).
pub fn source_name(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    path_slash::PathExt::to_slash_lossy(rel).into_owned()
}

/// Lexically rebases `path` (which is relative to `base`) onto `new_base`,
/// without touching the filesystem.
pub fn rebase_path(new_base: &Path, path: &Path) -> PathBuf {
    let mut new_path = new_base.to_path_buf();

    for component in path.components() {
        match component {
            std::path::Component::ParentDir => {
                if !new_path.pop() {
                    new_path.push(component);
                }
            }
            std::path::Component::CurDir => {}
            other => new_path.push(other),
        }
    }

    new_path
}
