//! File-backed cache for compiled output.
//!
//! This module provides a persistent cache keyed by transform identity,
//! source path, and a content fingerprint of the source. It supports:
//!
//! - Content fingerprints using SHA-256 hashing
//! - Cache roots derived from the running executable's path
//! - Atomic entry writes (temp file + rename)
//! - Fail-safe reads: corrupt or stale entries are misses

pub mod dir;
pub mod entry;
pub mod key;
pub mod store;

pub use crate::Error;

pub use dir::{CacheDirResolver, resolve_cache_dir};
pub use entry::{CacheEntry, CachedOutput};
pub use key::{CacheKey, Fingerprint};
pub use store::CompileCache;
