//! Unified error types for onload.
//!
//! Every variant carries an upper-case code prefix so log lines and host
//! diagnostics can be grepped by failure class.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Unified error types for onload initialization and caching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache root could not be derived or created.
    #[error("CACHE_DIR: {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The running executable's path could not be determined.
    #[error("CACHE_DIR: cannot determine process identity: {0}")]
    ProcessIdentity(#[source] std::io::Error),

    /// Reading or writing a cache entry failed.
    #[error("CACHE_IO: {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache entry header could not be encoded.
    #[error("CACHE_IO: failed to encode entry header: {0}")]
    Encode(#[from] serde_json::Error),

    /// Configuration failed to load or validate.
    #[error("CONFIG: {0}")]
    Config(#[from] ConfigError),

    /// A configured transform could not be constructed.
    #[error("TRANSFORM_BUILD: {id}: {reason}")]
    TransformBuild { id: String, reason: String },

    /// The process-wide runtime was already initialized.
    #[error("ALREADY_INITIALIZED: onload may only be initialized once per process")]
    AlreadyInitialized,
}

impl Error {
    /// Wrap an I/O failure on a cache entry path.
    pub fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = Error::CacheDir {
            path: PathBuf::from("/tmp/compile-cache-ab"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("CACHE_DIR"));
        assert!(msg.contains("compile-cache-ab"));

        let err = Error::cache_io("/tmp/x.entry", std::io::Error::other("disk full"));
        assert!(err.to_string().starts_with("CACHE_IO"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_already_initialized_display() {
        assert!(Error::AlreadyInitialized.to_string().contains("ALREADY_INITIALIZED"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: Error = ConfigError::LoadFailed("bad toml".into()).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn test_transform_build_display() {
        let err = Error::TransformBuild { id: "less".into(), reason: "empty command".into() };
        assert_eq!(err.to_string(), "TRANSFORM_BUILD: less: empty command");
    }
}
