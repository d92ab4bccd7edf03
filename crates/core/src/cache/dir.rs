//! Cache root resolution.
//!
//! The cache root is either supplied explicitly or derived from the running
//! executable's path, so repeated runs of the same binary share one cache
//! while different binaries or installations never collide.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::Error;

/// Prefix of derived cache directory names.
pub const CACHE_DIR_PREFIX: &str = "compile-cache-";

/// Derives the cache root for a process identity under a temp root.
#[derive(Debug, Clone)]
pub struct CacheDirResolver {
    temp_root: PathBuf,
    identity: PathBuf,
}

impl CacheDirResolver {
    /// Create a resolver for an explicit temp root and process identity.
    pub fn new(temp_root: impl Into<PathBuf>, identity: impl Into<PathBuf>) -> Self {
        Self { temp_root: temp_root.into(), identity: identity.into() }
    }

    /// Resolver for the running process: the platform temp directory and
    /// the current executable's path.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProcessIdentity` if the executable path is unavailable.
    pub fn for_current_process() -> Result<Self, Error> {
        let identity = std::env::current_exe().map_err(Error::ProcessIdentity)?;
        Ok(Self::new(std::env::temp_dir(), identity))
    }

    /// The derived directory, without touching the filesystem.
    pub fn derived_dir(&self) -> PathBuf {
        let digest = Sha256::digest(self.identity.as_os_str().as_encoded_bytes());
        self.temp_root
            .join(format!("{CACHE_DIR_PREFIX}{}", hex::encode(&digest[..16])))
    }

    /// Resolve and create the cache root.
    ///
    /// `explicit` wins over derivation. Creating an existing directory is a
    /// no-op.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf, Error> {
        match explicit {
            Some(dir) => ensure_dir(dir),
            None => ensure_dir(&self.derived_dir()),
        }
    }
}

/// Resolve the cache root for the running process.
///
/// An explicit directory is used without derivation, so the process identity
/// is only looked up when it is actually needed.
pub fn resolve_cache_dir(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    match explicit {
        Some(dir) => ensure_dir(dir),
        None => CacheDirResolver::for_current_process()?.resolve(None),
    }
}

fn ensure_dir(dir: &Path) -> Result<PathBuf, Error> {
    let absolute = std::path::absolute(dir).map_err(|source| Error::CacheDir { path: dir.to_path_buf(), source })?;
    std::fs::create_dir_all(&absolute).map_err(|source| Error::CacheDir { path: absolute.clone(), source })?;
    tracing::debug!(cache_dir = %absolute.display(), "cache directory ready");
    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_dir_deterministic() {
        let a = CacheDirResolver::new("/tmp", "/usr/bin/app");
        let b = CacheDirResolver::new("/tmp", "/usr/bin/app");
        assert_eq!(a.derived_dir(), b.derived_dir());
    }

    #[test]
    fn test_derived_dir_differs_per_identity() {
        let a = CacheDirResolver::new("/tmp", "/usr/bin/app");
        let b = CacheDirResolver::new("/tmp", "/opt/app/bin/app");
        assert_ne!(a.derived_dir(), b.derived_dir());
    }

    #[test]
    fn test_derived_dir_format() {
        let dir = CacheDirResolver::new("/tmp", "/usr/bin/app").derived_dir();
        assert_eq!(dir.parent(), Some(Path::new("/tmp")));
        let name = dir.file_name().unwrap().to_str().unwrap();
        let hash = name.strip_prefix(CACHE_DIR_PREFIX).unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_resolve_creates_derived_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = CacheDirResolver::new(tmp.path(), "/usr/bin/app");

        let dir = resolver.resolve(None).unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, resolver.derived_dir());
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let resolver = CacheDirResolver::new(tmp.path(), "/usr/bin/app");

        let first = resolver.resolve(None).unwrap();
        let second = resolver.resolve(None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_explicit_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("a").join("b").join("cache");
        let resolver = CacheDirResolver::new(tmp.path(), "/usr/bin/app");

        let dir = resolver.resolve(Some(&explicit)).unwrap();
        assert_eq!(dir, explicit);
        assert!(dir.is_dir());
        assert!(!resolver.derived_dir().exists());
    }

    #[test]
    fn test_resolve_fails_under_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let result = resolve_cache_dir(Some(&file.join("cache")));
        assert!(matches!(result, Err(Error::CacheDir { .. })));
    }

    #[test]
    fn test_resolve_cache_dir_for_current_process() {
        let resolver = CacheDirResolver::for_current_process().unwrap();
        let dir = resolve_cache_dir(None).unwrap();
        assert_eq!(dir, std::path::absolute(resolver.derived_dir()).unwrap());
        assert!(dir.is_dir());
    }
}
