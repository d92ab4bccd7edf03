//! Compile cache operations.
//!
//! Entries live at `<root>/<transform>/<slot>.entry`. Writes go to a
//! temporary file in the same directory which is then renamed over the slot,
//! so a concurrent reader sees either the previous complete entry or the new
//! one. Concurrent recompiles of one key are not deduplicated.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use super::entry::{self, CacheEntry, CachedOutput};
use super::key::CacheKey;
use crate::Error;

/// File extension for cache entries.
const ENTRY_EXT: &str = "entry";

/// On-disk cache of transformed output.
#[derive(Debug, Clone)]
pub struct CompileCache {
    root: PathBuf,
}

impl CompileCache {
    /// Open the cache rooted at an existing directory.
    ///
    /// Use [`resolve_cache_dir`](super::resolve_cache_dir) to obtain the root.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the slot holding the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(transform_dir_name(&key.transform))
            .join(format!("{}.{ENTRY_EXT}", key.slot_name()))
    }

    /// Read the entry for `key`.
    ///
    /// Missing, corrupt, or stale slots are misses, never errors.
    pub fn read_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unreadable cache entry treated as miss");
                return None;
            }
        };

        let entry = entry::decode(&raw, key);
        if entry.is_none() {
            tracing::debug!(path = %path.display(), "stale or invalid cache entry treated as miss");
        }
        entry
    }

    /// Cached output for `key`, if present and fresh.
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedOutput> {
        self.read_entry(key).map(|entry| entry.output)
    }

    /// Persist `output` as the entry for `key`, replacing any previous entry
    /// in the same slot.
    pub fn store(&self, key: &CacheKey, output: &CachedOutput) -> Result<(), Error> {
        let path = self.entry_path(key);
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir).map_err(|e| Error::cache_io(dir, e))?;

        let raw = entry::encode(key, output, Utc::now())?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::cache_io(dir, e))?;
        tmp.write_all(&raw).map_err(|e| Error::cache_io(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| Error::cache_io(&path, e.error))?;

        Ok(())
    }

    /// Return the cached output for `key`, compiling it with `compute` on a
    /// miss.
    ///
    /// `compute` runs at most once per call and only on a miss. Its error is
    /// returned unchanged and nothing is persisted. A failure to persist a
    /// successful compile is logged and the fresh output is still returned.
    pub fn get_or_compile<E, F>(&self, key: &CacheKey, compute: F) -> Result<CachedOutput, E>
    where
        F: FnOnce() -> Result<CachedOutput, E>,
    {
        if let Some(output) = self.lookup(key) {
            tracing::debug!(transform = %key.transform, path = %key.path.display(), "compile cache hit");
            return Ok(output);
        }

        tracing::debug!(transform = %key.transform, path = %key.path.display(), "compile cache miss");
        let output = compute()?;

        if let Err(e) = self.store(key, &output) {
            tracing::warn!(
                transform = %key.transform,
                path = %key.path.display(),
                error = %e,
                "failed to persist compiled output"
            );
        }

        Ok(output)
    }
}

/// Directory name for a transform id, restricted to a portable character set.
fn transform_dir_name(transform: &str) -> String {
    let name: String = transform
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '.') { format!("_{name}") } else { name }
}
