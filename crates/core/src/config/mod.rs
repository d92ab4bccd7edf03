//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (ONLOAD_*)
//! 2. TOML config file (if ONLOAD_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Placeholder in a transform command line that is replaced by the source path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (ONLOAD_*)
/// 2. TOML config file (if ONLOAD_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Explicit cache root directory.
    ///
    /// Set via ONLOAD_CACHE_DIR environment variable. When absent the cache
    /// root is derived from the running executable's path under the
    /// platform temp directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Upper bound for a single compile in milliseconds; 0 disables the bound.
    ///
    /// Set via ONLOAD_COMPILE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub compile_timeout_ms: u64,

    /// External-command transforms, in precedence order (first match wins).
    #[serde(default = "default_transforms")]
    pub transforms: Vec<TransformConfig>,
}

/// One external-command transform.
///
/// The source text is written to the command's stdin and the transformed
/// text is read from its stdout. Any argument equal to or containing
/// `{path}` has that placeholder replaced by the source file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Stable identity, used in cache keys and cache directory names.
    pub id: String,

    /// File extensions claimed by this transform, without the leading dot.
    pub extensions: Vec<String>,

    /// Mime type of the transformed output.
    pub mime_type: String,

    /// Program followed by its arguments.
    pub command: Vec<String>,
}

impl TransformConfig {
    fn preset(id: &str, extensions: &[&str], mime_type: &str, command: &[&str]) -> Self {
        Self {
            id: id.into(),
            extensions: extensions.iter().map(|e| (*e).to_string()).collect(),
            mime_type: mime_type.into(),
            command: command.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

fn default_transforms() -> Vec<TransformConfig> {
    vec![
        TransformConfig::preset(
            "babel",
            &["jsx", "es6"],
            "application/javascript",
            &["babel", "--filename={path}"],
        ),
        TransformConfig::preset(
            "coffeescript",
            &["coffee"],
            "application/javascript",
            &["coffee", "--compile", "--print", "--stdio"],
        ),
        TransformConfig::preset(
            "typescript",
            &["ts"],
            "application/javascript",
            &["esbuild", "--loader=ts", "--sourcefile={path}"],
        ),
        TransformConfig::preset("less", &["less"], "text/css", &["lessc", "-"]),
        TransformConfig::preset("scss", &["scss"], "text/css", &["sass", "--stdin"]),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { cache_dir: None, compile_timeout_ms: 0, transforms: default_transforms() }
    }
}

impl AppConfig {
    /// Compile bound as Duration, `None` when unbounded.
    pub fn compile_timeout(&self) -> Option<Duration> {
        (self.compile_timeout_ms > 0).then(|| Duration::from_millis(self.compile_timeout_ms))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `ONLOAD_`
    /// 2. TOML file from `ONLOAD_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("ONLOAD_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("ONLOAD_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.cache_dir.is_none());
        assert_eq!(config.compile_timeout_ms, 0);
        let ids: Vec<&str> = config.transforms.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["babel", "coffeescript", "typescript", "less", "scss"]);

        let babel = &config.transforms[0];
        assert_eq!(babel.extensions, ["jsx", "es6"]);
        assert_eq!(babel.mime_type, "application/javascript");
        assert!(babel.command.iter().any(|arg| arg.contains(PATH_PLACEHOLDER)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_compile_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.compile_timeout(), None);

        let config = AppConfig { compile_timeout_ms: 1500, ..Default::default() };
        assert_eq!(config.compile_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ONLOAD_CACHE_DIR", "/var/cache/onload");
            jail.set_env("ONLOAD_COMPILE_TIMEOUT_MS", "2500");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/onload")));
            assert_eq!(config.compile_timeout_ms, 2500);
            assert_eq!(config.transforms.len(), 5);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "onload.toml",
                r#"
                compile_timeout_ms = 800

                [[transforms]]
                id = "upper"
                extensions = ["up"]
                mime_type = "text/plain"
                command = ["tr", "a-z", "A-Z"]
                "#,
            )?;
            jail.set_env("ONLOAD_CONFIG_FILE", "onload.toml");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.compile_timeout_ms, 800);
            assert_eq!(config.transforms.len(), 1);
            assert_eq!(config.transforms[0].id, "upper");
            assert_eq!(config.transforms[0].command, ["tr", "a-z", "A-Z"]);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("onload.toml", "compile_timeout_ms = 800")?;
            jail.set_env("ONLOAD_CONFIG_FILE", "onload.toml");
            jail.set_env("ONLOAD_COMPILE_TIMEOUT_MS", "900");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.compile_timeout_ms, 900);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("ONLOAD_COMPILE_TIMEOUT_MS", "999999999");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
