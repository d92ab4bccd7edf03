//! Process-wide runtime.
//!
//! Initialization resolves the cache root, builds the transform registry from
//! configuration and freezes it. It happens exactly once per process and
//! before any request is handled; afterwards the runtime is read-only.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use onload_core::cache::resolve_cache_dir;
use onload_core::{AppConfig, CompileCache, Error};

use crate::intercept::Interceptor;
use crate::transform::{CommandTransform, RegistryBuilder};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Frozen registry, cache and request handler.
#[derive(Debug)]
pub struct Runtime {
    interceptor: Interceptor,
    cache_dir: PathBuf,
}

impl Runtime {
    /// Build a runtime from configuration alone.
    pub fn build(config: &AppConfig) -> Result<Self, Error> {
        Self::build_with(config, RegistryBuilder::new())
    }

    /// Build a runtime on top of embedder-registered transforms.
    ///
    /// Transforms already on `builder` take precedence over the configured
    /// command transforms.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the cache root
    /// cannot be resolved, or a configured transform cannot be built.
    pub fn build_with(config: &AppConfig, mut builder: RegistryBuilder) -> Result<Self, Error> {
        config.validate()?;

        let cache_dir = resolve_cache_dir(config.cache_dir.as_deref())?;

        for transform in &config.transforms {
            builder.register(CommandTransform::from_config(transform)?);
        }
        let registry = Arc::new(builder.build(Some(&cache_dir)));

        let interceptor = Interceptor::new(registry, CompileCache::open(&cache_dir))
            .with_compile_timeout(config.compile_timeout());

        Ok(Self { interceptor, cache_dir })
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Initialize the process-wide runtime from configuration.
///
/// # Errors
///
/// Returns `Error::AlreadyInitialized` on every call after the first
/// successful one, or the build error if initialization fails.
pub fn init(config: &AppConfig) -> Result<&'static Runtime, Error> {
    init_with(config, RegistryBuilder::new())
}

/// Initialize the process-wide runtime with embedder transforms.
pub fn init_with(config: &AppConfig, builder: RegistryBuilder) -> Result<&'static Runtime, Error> {
    if RUNTIME.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let runtime = Runtime::build_with(config, builder)?;
    RUNTIME.set(runtime).map_err(|_| Error::AlreadyInitialized)?;
    let runtime = RUNTIME.get().ok_or(Error::AlreadyInitialized)?;

    tracing::info!(
        cache_dir = %runtime.cache_dir.display(),
        transforms = ?runtime.interceptor.registry().ids().collect::<Vec<_>>(),
        "onload initialized"
    );

    Ok(runtime)
}

/// The process-wide runtime, once initialized.
pub fn runtime() -> Option<&'static Runtime> {
    RUNTIME.get()
}
