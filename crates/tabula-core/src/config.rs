//! Core configuration, loaded from RON.
//!
//! ```ron
//! (
//!     history: (max_depth: 200),
//!     copy_name_prefix: "Copy of ",
//! )
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::history::HistoryConfig;

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Settings for a mutator session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub history: HistoryConfig,
    /// Prepended to the name of a duplicated property.
    pub copy_name_prefix: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            copy_name_prefix: "Copy of ".to_string(),
        }
    }
}

impl CoreConfig {
    /// Parse from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.history.max_depth, 100);
        assert_eq!(config.copy_name_prefix, "Copy of ");
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = CoreConfig::from_ron_str("(history: (max_depth: 5))").unwrap();
        assert_eq!(config.history.max_depth, 5);
        assert_eq!(config.copy_name_prefix, "Copy of ");

        let config = CoreConfig::from_ron_str("()").unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_full_ron() {
        let config =
            CoreConfig::from_ron_str(r#"(history: (max_depth: 0), copy_name_prefix: "Kopie von ")"#)
                .unwrap();
        assert_eq!(config.history, HistoryConfig::unlimited());
        assert_eq!(config.copy_name_prefix, "Kopie von ");
    }

    #[test]
    fn test_bad_ron_is_error() {
        assert!(matches!(
            CoreConfig::from_ron_str("(history: 12"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabula.ron");
        std::fs::write(&path, "(copy_name_prefix: \"Dup \")").unwrap();
        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.copy_name_prefix, "Dup ");

        assert!(matches!(
            CoreConfig::load(dir.path().join("missing.ron")),
            Err(ConfigError::Io(_))
        ));
    }
}
