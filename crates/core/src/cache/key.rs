//! Content-addressed cache key generation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of a source file's bytes, hex encoded.
///
/// Freshness is decided by this fingerprint alone: a source whose bytes
/// change gets a new fingerprint even if its mtime does not move.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint a source's bytes.
    pub fn of(source: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(source)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup key into the compile cache.
///
/// Two requests with an identical key refer to identical output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Identity of the transform that produced the output.
    pub transform: String,
    /// Absolute source path.
    pub path: PathBuf,
    /// Fingerprint of the source the output was compiled from.
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    /// Build a key for `source` read from `path`, compiled by `transform`.
    pub fn new(transform: impl Into<String>, path: impl Into<PathBuf>, source: &[u8]) -> Self {
        Self { transform: transform.into(), path: path.into(), fingerprint: Fingerprint::of(source) }
    }

    /// Name of the on-disk slot for this key's transform and path.
    ///
    /// The fingerprint is not part of the slot name: a recompile of a changed
    /// source overwrites the previous entry for the same transform and path.
    pub fn slot_name(&self) -> String {
        compute_slot_name(&self.transform, &self.path)
    }
}

/// Compute the slot name for a transform and source path.
pub fn compute_slot_name(transform: &str, path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(transform.as_bytes());
    hasher.update(b"\n");
    hasher.update(path.as_os_str().as_encoded_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_stability() {
        assert_eq!(Fingerprint::of(b"a = 1"), Fingerprint::of(b"a = 1"));
        assert_ne!(Fingerprint::of(b"a = 1"), Fingerprint::of(b"a = 2"));
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = Fingerprint::of(b"square = (x) -> x * x");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp.to_string(), fp.as_str());
    }

    #[test]
    fn test_slot_ignores_fingerprint() {
        let a = CacheKey::new("coffeescript", "/project/app.coffee", b"one");
        let b = CacheKey::new("coffeescript", "/project/app.coffee", b"two");
        assert_ne!(a, b);
        assert_eq!(a.slot_name(), b.slot_name());
    }

    #[test]
    fn test_slot_different_transform() {
        let a = CacheKey::new("less", "/project/site.less", b"x");
        let b = CacheKey::new("scss", "/project/site.less", b"x");
        assert_ne!(a.slot_name(), b.slot_name());
    }

    #[test]
    fn test_slot_different_path() {
        let a = compute_slot_name("less", Path::new("/project/a.less"));
        let b = compute_slot_name("less", Path::new("/project/b.less"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
