//! Compile-on-load interception for onload.
//!
//! This crate provides the transform contract and registry, URL
//! normalization, the per-request interceptor with its host mapping, and the
//! init-once process runtime used by the host.

pub mod intercept;
pub mod runtime;
pub mod transform;

pub use intercept::{HostErrorCode, HostResponse, Interceptor, LoadOutcome, LoadRequest};
pub use runtime::{Runtime, init, init_with, runtime};
pub use transform::{CommandTransform, RegistryBuilder, Transform, TransformError, TransformRegistry};
