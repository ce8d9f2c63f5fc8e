//! Configuration management.
//!
//! awgraph configuration can come from:
//! - Environment variables (AWGRAPH_*)
//! - Config file (~/.config/awgraph/config.toml)
//! - An explicit file passed with `--config`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::artifacts::LookupMode;
use crate::error::{Error, Result};
use crate::jobs::{RenderOptions, DEFAULT_IF_FOLD_THRESHOLD};

/// awgraph configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rendering of the `jobs:` block
    #[serde(default)]
    pub render: RenderConfig,

    /// Artifact validation
    #[serde(default)]
    pub artifacts: ArtifactConfig,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// `if:` expressions longer than this are folded
    #[serde(default = "default_if_fold_threshold")]
    pub if_fold_threshold: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            if_fold_threshold: default_if_fold_threshold(),
        }
    }
}

fn default_if_fold_threshold() -> usize {
    DEFAULT_IF_FOLD_THRESHOLD
}

/// Artifact configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Whether lookups may fall back to jobs outside `needs`
    #[serde(default)]
    pub lookup: LookupMode,

    /// Treat unresolved downloads as errors instead of warnings
    #[serde(default)]
    pub fail_on_unresolved: bool,
}

impl Config {
    /// Load configuration from the default location plus environment.
    pub fn load() -> Self {
        let mut config = Self::default();

        let primary_path = Self::config_dir().join("config.toml");
        if let Ok(partial) = Self::load_partial_from_path(&primary_path) {
            config.apply_partial(partial);
        }

        config.apply_env_overrides();
        config
    }

    /// Load configuration from an explicit file plus environment.
    ///
    /// Unlike [`Config::load`], a missing or malformed file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::default();
        config.apply_partial(toml::from_str(&content)?);
        config.apply_env_overrides();
        Ok(config)
    }

    /// Get the config directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("awgraph"))
            .unwrap_or_else(|| PathBuf::from(".awgraph"))
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            if_fold_threshold: self.render.if_fold_threshold,
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(threshold) = var("AWGRAPH_IF_FOLD_THRESHOLD") {
            if let Ok(parsed) = threshold.parse::<usize>() {
                self.render.if_fold_threshold = parsed;
            }
        }
        if let Some(lookup) = var("AWGRAPH_ARTIFACT_LOOKUP") {
            match lookup.to_lowercase().as_str() {
                "strict" => self.artifacts.lookup = LookupMode::Strict,
                "lenient" => self.artifacts.lookup = LookupMode::Lenient,
                other => tracing::warn!(value = other, "Ignoring unknown AWGRAPH_ARTIFACT_LOOKUP"),
            }
        }
        if let Some(fail) = var("AWGRAPH_FAIL_ON_UNRESOLVED") {
            self.artifacts.fail_on_unresolved = matches!(fail.to_lowercase().as_str(), "true" | "1");
        }
    }

    fn load_partial_from_path(path: &Path) -> std::result::Result<PartialConfig, ()> {
        let content = std::fs::read_to_string(path).map_err(|_| ())?;
        toml::from_str(&content).map_err(|_| ())
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(render) = partial.render {
            self.render = render;
        }
        if let Some(artifacts) = partial.artifacts {
            self.artifacts = artifacts;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    render: Option<RenderConfig>,
    artifacts: Option<ArtifactConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.render.if_fold_threshold, 120);
        assert_eq!(config.artifacts.lookup, LookupMode::Lenient);
        assert!(!config.artifacts.fail_on_unresolved);
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_partial_file() {
        let partial: PartialConfig = toml::from_str(
            r#"
[artifacts]
lookup = "strict"
"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_partial(partial);
        assert_eq!(config.artifacts.lookup, LookupMode::Strict);
        assert_eq!(config.render.if_fold_threshold, 120);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AWGRAPH_IF_FOLD_THRESHOLD", "80"),
            ("AWGRAPH_ARTIFACT_LOOKUP", "Strict"),
            ("AWGRAPH_FAIL_ON_UNRESOLVED", "true"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.render.if_fold_threshold, 80);
        assert_eq!(config.artifacts.lookup, LookupMode::Strict);
        assert!(config.artifacts.fail_on_unresolved);
    }

    #[test]
    fn test_invalid_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| {
            (key == "AWGRAPH_IF_FOLD_THRESHOLD").then(|| "not-a-number".to_string())
        });
        assert_eq!(config.render.if_fold_threshold, 120);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[render]\nif_fold_threshold = 60\n[artifacts]\nfail_on_unresolved = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.render.if_fold_threshold, 60);
        assert!(config.artifacts.fail_on_unresolved);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[render\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.code(), "TOML_ERROR");
    }
}
