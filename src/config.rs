use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::html::SanitizePolicy;
use crate::theme::Theme;

const CONFIG_FILE_NAME: &str = ".richcomposerc";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// User preferences of the compose surface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Offer undo/redo in the context menu
    pub undo_manager: bool,
    /// Offer the arrow entry in the context menu
    pub show_arrow: bool,
    pub theme: Theme,
    pub policy: SanitizePolicy,
}

impl ComposeConfig {
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(path, &contents)
    }

    /// Load `path`, or the rc file in the home directory when `None`.
    /// A missing file means defaults; a broken one is logged and ignored.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::config_path) else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{err}; using defaults");
                Self::default()
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config = ComposeConfig::from_toml(
            Path::new("test.toml"),
            r#"
            undo_manager = true

            [theme]
            quote_stripe_width = 2

            [policy]
            allowed_tags = ["b"]
            "#,
        )
        .unwrap();
        assert!(config.undo_manager);
        assert!(!config.show_arrow);
        assert_eq!(config.theme.quote_stripe_width, 2);
        assert_eq!(config.theme.quote_color, Theme::default().quote_color);
        assert!(config.policy.allows_tag("b"));
        assert!(!config.policy.allows_tag("i"));
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rc.toml");
        fs::write(&path, "undo_manager = [").unwrap();
        assert!(matches!(
            ComposeConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(ComposeConfig::load(Some(&path)), ComposeConfig::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(ComposeConfig::load(Some(&path)), ComposeConfig::default());
    }
}
