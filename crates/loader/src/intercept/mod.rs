//! Per-request interception.
//!
//! [`Interceptor::handle`] turns one host load request into exactly one
//! [`LoadOutcome`]:
//!
//! 1. normalize the URL (remote and unsupported URLs end here)
//! 2. find the transform for the local path (no match is a passthrough)
//! 3. read the source
//! 4. compile through the cache on the blocking pool

pub mod outcome;
pub mod path;

pub use outcome::{HostErrorCode, HostResponse, LoadOutcome};
pub use path::{Normalized, Platform, normalize, normalize_for};

use std::error::Error as StdError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use onload_core::{CacheKey, CachedOutput, CompileCache};

use crate::transform::{Lookup, Transform, TransformError, TransformRegistry};

/// A load request as issued by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub method: String,
    pub url: String,
}

impl LoadRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: "GET".into(), url: url.into() }
    }
}

/// Handles load requests against a frozen registry and a compile cache.
///
/// Holds no per-request state; one instance serves any number of concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct Interceptor {
    registry: Arc<TransformRegistry>,
    cache: CompileCache,
    compile_timeout: Option<Duration>,
}

impl Interceptor {
    pub fn new(registry: Arc<TransformRegistry>, cache: CompileCache) -> Self {
        Self { registry, cache, compile_timeout: None }
    }

    /// Bound each compile; `None` leaves compiles unbounded.
    pub fn with_compile_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.compile_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    /// Handle one request.
    pub async fn handle(&self, request: &LoadRequest) -> LoadOutcome {
        match normalize(&request.url) {
            Normalized::LocalPath(path) => self.load_path(path).await,
            Normalized::Remote(url) => {
                tracing::debug!(url = %url, "delegating protocol-relative request");
                LoadOutcome::Remote(url)
            }
            Normalized::Unsupported(reason) => {
                tracing::warn!(
                    url = %request.url,
                    method = %request.method,
                    reason = %reason,
                    "unsupported request URL"
                );
                LoadOutcome::Unsupported { url: request.url.clone(), reason }
            }
        }
    }

    /// Handle a request already normalized to a local path.
    pub async fn load_path(&self, path: PathBuf) -> LoadOutcome {
        let transform = match self.registry.find(&path) {
            Lookup::Found(transform) => transform,
            Lookup::NoMatch => {
                tracing::debug!(path = %path.display(), "no transform; passing through");
                return LoadOutcome::Passthrough(path);
            }
            Lookup::Failed(failure) => {
                tracing::error!(path = %path.display(), error = %failure, "transform dispatch failed");
                return LoadOutcome::DispatchError { path, message: failure.to_string() };
            }
        };

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), transform = transform.id(), "source not found");
                return LoadOutcome::NotFound;
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to read source");
                return LoadOutcome::ReadError { path, message: e.to_string() };
            }
        };

        let source = match String::from_utf8(raw) {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "source is not valid UTF-8");
                return LoadOutcome::ReadError { path, message: format!("source is not valid UTF-8: {e}") };
            }
        };

        let mime_type = transform.mime_type().to_string();
        match self.compile(Arc::clone(&transform), path.clone(), source).await {
            Ok(output) => LoadOutcome::Content { bytes: output.bytes, mime_type: output.mime_type },
            Err(message) => {
                tracing::warn!(path = %path.display(), transform = transform.id(), error = %message, "compile failed");
                LoadOutcome::CompileError { diagnostic: diagnostic(&path, &message), mime_type }
            }
        }
    }

    /// Compile through the cache on the blocking pool.
    ///
    /// The error is the rendered failure message. The transform is handed the
    /// timeout as a deadline so it can stop its own work; whatever it still
    /// returns after the timeout fired is dropped.
    async fn compile(
        &self, transform: Arc<dyn Transform>, path: PathBuf, source: String,
    ) -> Result<CachedOutput, String> {
        let cache = self.cache.clone();
        let deadline = self.compile_timeout.map(|limit| Instant::now() + limit);
        let task = tokio::task::spawn_blocking(move || {
            let key = CacheKey::new(transform.id(), &path, source.as_bytes());
            cache.get_or_compile(&key, || {
                let text = transform.compile_until(&path, &source, deadline)?;
                Ok::<_, TransformError>(CachedOutput::new(text, transform.mime_type()))
            })
        });

        let joined = match self.compile_timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(format!("compile timed out after {}ms", limit.as_millis())),
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(error_chain(&e)),
            Err(e) => Err(format!("compile task failed: {e}")),
        }
    }
}

/// `"Failed to compile <path>: <message>"`.
fn diagnostic(path: &Path, message: &str) -> String {
    format!("Failed to compile {}: {message}", path.display())
}

/// An error's message followed by each of its sources.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
