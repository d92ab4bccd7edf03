//! Core types and shared functionality for onload.
//!
//! This crate provides:
//! - Compile cache with a file-backed store
//! - Cache root resolution
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheKey, CachedOutput, CompileCache};
pub use config::{AppConfig, TransformConfig};
pub use error::Error;
