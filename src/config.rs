//! Composition configuration.
//!
//! Handles loading and validating `unify.toml` from the source root. All
//! fields have working defaults; user config files are sparse and only
//! override what they name. Unknown keys are rejected to catch typos early.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! area_prefix = "unify-"        # Class prefix marking layout slots
//! layout_filename = "_layout.html"  # Default layout file looked up per directory
//! layouts_dir = "layouts"       # Where short-name data-unify pointers resolve
//! max_include_depth = 10        # Include nesting limit (fatal when exceeded)
//!
//! [lint]
//! missing-docs = "warn"
//! duplicate-area-class = "error"
//! selector-specificity = "warn"
//! undocumented-area-class = "warn"
//! unused-doc-class = "info"
//! duplicate-landmark = "warn"
//! ```
//!
//! There is no ambient default instance: the loaded config is threaded
//! explicitly through [`crate::compose::Composer`] and friends.

use crate::lint::LintConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file within the source root.
pub const CONFIG_FILENAME: &str = "unify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Composition settings loaded from `unify.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    /// Class prefix marking area slots on layout and page elements.
    pub area_prefix: String,
    /// Filename of the default per-directory layout.
    pub layout_filename: String,
    /// Directory under the source root where short-name layout pointers
    /// resolve.
    pub layouts_dir: String,
    /// Include nesting limit; exceeding it is a fatal expansion error.
    pub max_include_depth: usize,
    /// Linter rule severities.
    pub lint: LintConfig,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            area_prefix: "unify-".to_string(),
            layout_filename: "_layout.html".to_string(),
            layouts_dir: "layouts".to_string(),
            max_include_depth: crate::include::DEFAULT_MAX_DEPTH,
            lint: LintConfig::default(),
        }
    }
}

impl ComposeConfig {
    /// Validate values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.area_prefix.is_empty() || self.area_prefix.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "area_prefix must be a non-empty class prefix without whitespace".into(),
            ));
        }
        if self.layout_filename.is_empty() || self.layout_filename.contains('/') {
            return Err(ConfigError::Validation(
                "layout_filename must be a bare filename".into(),
            ));
        }
        if self.max_include_depth == 0 {
            return Err(ConfigError::Validation(
                "max_include_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load config from the source root, falling back to defaults when no
/// `unify.toml` exists. The result is always validated.
pub fn load_config(source_root: &Path) -> Result<ComposeConfig, ConfigError> {
    let path = source_root.join(CONFIG_FILENAME);
    let config = if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content)?
    } else {
        ComposeConfig::default()
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Severity;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = ComposeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.area_prefix, "unify-");
        assert_eq!(config.layout_filename, "_layout.html");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.area_prefix, "unify-");
    }

    #[test]
    fn sparse_overrides_merge_with_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "area_prefix = \"slot-\"\n\n[lint]\nmissing-docs = \"off\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.area_prefix, "slot-");
        assert_eq!(config.lint.missing_docs, Severity::Off);
        // Untouched fields keep defaults.
        assert_eq!(config.max_include_depth, 10);
        assert_eq!(config.lint.duplicate_area_class, Severity::Error);
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "area_prefixx = \"x\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn empty_prefix_fails_validation() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "area_prefix = \"\"\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn zero_include_depth_fails_validation() {
        let config = ComposeConfig {
            max_include_depth: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
