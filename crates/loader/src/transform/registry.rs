//! Ordered transform registry.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::{Transform, TransformError};

/// Collects transforms at startup, in precedence order.
#[derive(Default)]
pub struct RegistryBuilder {
    transforms: Vec<Box<dyn Transform>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform. Earlier registrations take precedence.
    pub fn register(&mut self, transform: impl Transform + 'static) -> &mut Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Append an already boxed transform.
    pub fn register_boxed(&mut self, transform: Box<dyn Transform>) -> &mut Self {
        self.transforms.push(transform);
        self
    }

    /// Freeze the registry, handing every transform the cache directory.
    pub fn build(self, cache_dir: Option<&Path>) -> TransformRegistry {
        let transforms: Vec<Arc<dyn Transform>> = self
            .transforms
            .into_iter()
            .map(|mut transform| {
                if let Some(dir) = cache_dir {
                    transform.set_cache_directory(dir);
                }
                Arc::from(transform)
            })
            .collect();
        TransformRegistry { transforms }
    }
}

/// Result of resolving a path against the registry.
pub enum Lookup {
    /// First transform whose predicate accepted the path.
    Found(Arc<dyn Transform>),
    /// No transform claims the path.
    NoMatch,
    /// No transform claimed the path and at least one predicate failed.
    Failed(DispatchFailure),
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(t) => f.debug_tuple("Found").field(&t.id()).finish(),
            Self::NoMatch => f.write_str("NoMatch"),
            Self::Failed(failure) => f.debug_tuple("Failed").field(failure).finish(),
        }
    }
}

/// Predicate failures collected during a lookup.
#[derive(Debug)]
pub struct DispatchFailure {
    pub failures: Vec<(String, TransformError)>,
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (id, err)) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{id}: {err}")?;
        }
        Ok(())
    }
}

/// Immutable, ordered set of transforms.
///
/// Lookups take `&self` only, so concurrent requests share one registry
/// without locking.
pub struct TransformRegistry {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Resolve the transform for `path`.
    ///
    /// A failing predicate is logged and treated as "no match"; the lookup
    /// goes on with the next transform. Only when nothing matches and some
    /// predicate failed is the lookup reported as failed.
    pub fn find(&self, path: &Path) -> Lookup {
        let mut failures = Vec::new();

        for transform in &self.transforms {
            match transform.matches(path) {
                Ok(true) => return Lookup::Found(Arc::clone(transform)),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        transform = transform.id(),
                        path = %path.display(),
                        error = %e,
                        "transform predicate failed; skipping"
                    );
                    failures.push((transform.id().to_string(), e));
                }
            }
        }

        if failures.is_empty() { Lookup::NoMatch } else { Lookup::Failed(DispatchFailure { failures }) }
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transform ids in precedence order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.transforms.iter().map(|t| t.id())
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}
