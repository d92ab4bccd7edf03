//! Pluggable source transforms.
//!
//! ### Capability Contract
//! - `matches` claims a file by path; it may fail.
//! - `compile` turns source text into the transform's output format.
//! - `set_cache_directory` is advisory: a transform may keep its own private
//!   sub-cache there, independent of the shared compile cache.
//!
//! ### Registration
//! - Transforms are registered on a [`RegistryBuilder`] at startup and frozen
//!   into a [`TransformRegistry`]; order is precedence (first match wins).

pub mod command;
pub mod registry;

pub use command::CommandTransform;
pub use registry::{DispatchFailure, Lookup, RegistryBuilder, TransformRegistry};

use std::path::Path;
use std::time::Instant;

/// Errors raised by transforms.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The transform rejected the source.
    #[error("{0}")]
    Rejected(String),

    /// The external compiler could not be started.
    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The external compiler exited unsuccessfully.
    #[error("`{command}` exited with {status}: {stderr}")]
    Exited { command: String, status: String, stderr: String },

    /// The external compiler ran past its deadline and was killed.
    #[error("`{command}` killed at its compile deadline after {elapsed_ms}ms")]
    TimedOut { command: String, elapsed_ms: u128 },

    /// I/O while exchanging data with the transform.
    #[error("transform I/O error")]
    Io(#[from] std::io::Error),

    /// The transform produced output that is not valid UTF-8.
    #[error("transform produced invalid output: {0}")]
    InvalidOutput(String),

    /// The path predicate itself failed.
    #[error("predicate failed: {0}")]
    Predicate(String),
}

/// A source transform.
///
/// Implementations must be deterministic for a given source if cached
/// output is to be byte-identical to a fresh compile.
pub trait Transform: Send + Sync {
    /// Stable identity, part of every cache key this transform produces.
    fn id(&self) -> &str;

    /// Whether this transform claims `path`.
    fn matches(&self, path: &Path) -> Result<bool, TransformError>;

    /// Mime type of the transformed output.
    fn mime_type(&self) -> &str;

    /// Transform `source`, read from `path`.
    fn compile(&self, path: &Path, source: &str) -> Result<String, TransformError>;

    /// Transform `source`, giving up at `deadline`.
    ///
    /// Transforms that hold external resources (child processes) override
    /// this to release them once the deadline passes. The default ignores
    /// the deadline.
    fn compile_until(
        &self, path: &Path, source: &str, _deadline: Option<Instant>,
    ) -> Result<String, TransformError> {
        self.compile(path, source)
    }

    /// Advisory cache directory for the transform's private use.
    fn set_cache_directory(&mut self, _dir: &Path) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransformError::Exited {
            command: "lessc -".into(),
            status: "exit status: 1".into(),
            stderr: "ParseError: Unrecognised input".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("lessc -"));
        assert!(msg.contains("Unrecognised input"));

        let err = TransformError::Rejected("unexpected indentation".into());
        assert_eq!(err.to_string(), "unexpected indentation");
    }

    #[test]
    fn test_io_error_renders_once_in_chain() {
        let err = TransformError::from(std::io::Error::other("broken pipe"));
        assert_eq!(err.to_string(), "transform I/O error");
        assert_eq!(std::error::Error::source(&err).map(ToString::to_string).as_deref(), Some("broken pipe"));
    }

    #[test]
    fn test_spawn_error_has_source() {
        let err = TransformError::Spawn {
            command: "coffee".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
