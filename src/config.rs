//! Configuration handling for the forms engine

use crate::forms::{FieldDescriptor, Messages};
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "labconsole_forms=info";

/// User configuration shared by every form of the console
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FormsConfig {
    /// Overrides for the default validation messages
    #[serde(default)]
    pub messages: Messages,
    /// tracing filter directive, e.g. "labconsole_forms=debug"
    pub log_filter: Option<String>,
    /// Events that validate a field, when a binding does not say otherwise
    pub validate_triggers: Option<Vec<String>>,
}

impl FormsConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "labconsole", "labconsole-forms")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from the user's config directory
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: FormsConfig = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded forms config");
        Ok(config)
    }

    /// Save configuration to the user's config directory
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Descriptor for `name` using the configured validate triggers
    pub fn descriptor(&self, name: &str) -> FieldDescriptor {
        let descriptor = FieldDescriptor::new(name);
        match &self.validate_triggers {
            Some(events) => descriptor.validate_on(events.iter().cloned()),
            None => descriptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(file: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("labconsole-forms-test-{}", uuid::Uuid::new_v4()))
            .join(file)
    }

    #[test]
    fn test_default_config() {
        let config = FormsConfig::default();
        assert_eq!(config.messages, Messages::default());
        assert!(config.log_filter.is_none());
        assert!(config.validate_triggers.is_none());
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_deserialize_from_empty_json() {
        let parsed: FormsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, FormsConfig::default());
    }

    #[test]
    fn test_partial_messages_override() {
        let json = r#"{"messages": {"required": "required by lab policy"}, "unknown_field": 1}"#;
        let parsed: FormsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.messages.required, "required by lab policy");
        assert_eq!(parsed.messages.invalid, Messages::default().invalid);
    }

    #[test]
    fn test_descriptor_uses_configured_triggers() {
        let config = FormsConfig {
            validate_triggers: Some(vec!["onChange".to_string()]),
            ..Default::default()
        };
        let descriptor = config.descriptor("badge");
        assert!(descriptor.is_validate_trigger("onChange"));
        assert!(!descriptor.is_validate_trigger("onBlur"));

        let default = FormsConfig::default().descriptor("badge");
        assert!(default.is_validate_trigger("onBlur"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = scratch_path("config.json");
        let config = FormsConfig {
            log_filter: Some("labconsole_forms=debug".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        let loaded = FormsConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let loaded = FormsConfig::load_from(&scratch_path("missing.json")).unwrap();
        assert_eq!(loaded, FormsConfig::default());
    }

    #[test]
    fn test_config_path_returns_option() {
        // Just test that the function doesn't panic
        let _path = FormsConfig::config_path();
    }
}
