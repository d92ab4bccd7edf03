//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Longest accepted compile bound (10 minutes).
const MAX_COMPILE_TIMEOUT_MS: u64 = 600_000;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `compile_timeout_ms` exceeds 10 minutes
    /// - a transform has an empty id, mime type, command or extension list
    /// - two transforms share an id
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compile_timeout_ms > MAX_COMPILE_TIMEOUT_MS {
            return Err(ConfigError::Invalid {
                field: "compile_timeout_ms".into(),
                reason: "must not exceed 10 minutes (600000ms)".into(),
            });
        }

        if let Some(dir) = &self.cache_dir
            && dir.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid { field: "cache_dir".into(), reason: "must not be empty".into() });
        }

        let mut seen = HashSet::new();
        for (i, transform) in self.transforms.iter().enumerate() {
            let field = |name: &str| format!("transforms[{i}].{name}");

            if transform.id.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field("id"), reason: "must not be empty".into() });
            }
            if transform.id.contains(['/', '\\']) || transform.id == "." || transform.id == ".." {
                return Err(ConfigError::Invalid {
                    field: field("id"),
                    reason: "must be usable as a directory name".into(),
                });
            }
            if !seen.insert(transform.id.as_str()) {
                return Err(ConfigError::Invalid {
                    field: field("id"),
                    reason: format!("duplicate transform id '{}'", transform.id),
                });
            }
            if transform.mime_type.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field("mime_type"), reason: "must not be empty".into() });
            }
            if transform.command.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(ConfigError::Invalid { field: field("command"), reason: "must name a program".into() });
            }
            if transform.extensions.is_empty() {
                return Err(ConfigError::Invalid {
                    field: field("extensions"),
                    reason: "must list at least one extension".into(),
                });
            }
            if transform
                .extensions
                .iter()
                .any(|ext| ext.is_empty() || ext.starts_with('.'))
            {
                return Err(ConfigError::Invalid {
                    field: field("extensions"),
                    reason: "extensions must be non-empty and given without the leading dot".into(),
                });
            }
        }

        if self.transforms.is_empty() {
            tracing::warn!("No transforms configured; every request will pass through unmodified");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformConfig;
    use std::path::PathBuf;

    fn transform(id: &str) -> TransformConfig {
        TransformConfig {
            id: id.into(),
            extensions: vec!["up".into()],
            mime_type: "text/plain".into(),
            command: vec!["tr".into(), "a-z".into(), "A-Z".into()],
        }
    }

    fn assert_invalid(config: &AppConfig, expected_field: &str) {
        let result = config.validate();
        assert!(
            matches!(&result, Err(ConfigError::Invalid { field, .. }) if field == expected_field),
            "expected invalid {expected_field}, got {result:?}"
        );
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { compile_timeout_ms: 600_001, ..Default::default() };
        assert_invalid(&config, "compile_timeout_ms");
    }

    #[test]
    fn test_validate_timeout_at_limit() {
        let config = AppConfig { compile_timeout_ms: 600_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_cache_dir() {
        let config = AppConfig { cache_dir: Some(PathBuf::new()), ..Default::default() };
        assert_invalid(&config, "cache_dir");
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let config = AppConfig { transforms: vec![transform("upper"), transform("upper")], ..Default::default() };
        assert_invalid(&config, "transforms[1].id");
    }

    #[test]
    fn test_validate_id_with_separator() {
        let config = AppConfig { transforms: vec![transform("a/b")], ..Default::default() };
        assert_invalid(&config, "transforms[0].id");
    }

    #[test]
    fn test_validate_empty_command() {
        let config = AppConfig {
            transforms: vec![TransformConfig { command: vec![], ..transform("upper") }],
            ..Default::default()
        };
        assert_invalid(&config, "transforms[0].command");
    }

    #[test]
    fn test_validate_empty_mime_type() {
        let config = AppConfig {
            transforms: vec![TransformConfig { mime_type: " ".into(), ..transform("upper") }],
            ..Default::default()
        };
        assert_invalid(&config, "transforms[0].mime_type");
    }

    #[test]
    fn test_validate_extensions() {
        let config = AppConfig {
            transforms: vec![TransformConfig { extensions: vec![], ..transform("upper") }],
            ..Default::default()
        };
        assert_invalid(&config, "transforms[0].extensions");

        let config = AppConfig {
            transforms: vec![TransformConfig { extensions: vec![".up".into()], ..transform("upper") }],
            ..Default::default()
        };
        assert_invalid(&config, "transforms[0].extensions");
    }

    #[test]
    fn test_validate_no_transforms() {
        let config = AppConfig { transforms: vec![], ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
