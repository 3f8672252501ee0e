//! Column selection configuration

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Caller-supplied adjustments to the fixed applicant and loan column lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Extra columns to carry through to the feature table
    pub include: Vec<String>,
    /// Columns to remove from the selection; each must be selected
    pub exclude: Vec<String>,
}

impl SelectionConfig {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Parse a config from JSON such as `{"include": ["purpose"], "exclude": []}`.
    /// Missing keys default to empty lists.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse selection config")
    }

    /// Read a JSON config file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let config = SelectionConfig::default();
        assert!(config.include.is_empty());
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_from_json_with_missing_keys() {
        let config = SelectionConfig::from_json_str(r#"{"include": ["purpose"]}"#).unwrap();
        assert_eq!(config.include, vec!["purpose".to_string()]);
        assert!(config.exclude.is_empty());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SelectionConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("selection.json");
        std::fs::write(&path, r#"{"include": [], "exclude": ["dti"]}"#).unwrap();

        let config = SelectionConfig::from_json_file(&path).unwrap();
        assert_eq!(config, SelectionConfig::new(vec![], vec!["dti".to_string()]));
    }
}
