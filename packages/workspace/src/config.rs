use crate::deserializer::MissingTemplatePolicy;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "pagecraft.config.json";

/// Pagecraft configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Directory holding `<template-ref>.html` files
    pub template_dir: String,

    /// Directory for local drafts
    pub draft_dir: String,

    /// Root that relative links and assets resolve against
    pub asset_root: String,

    pub template_ttl_secs: u64,

    pub history_quiescence_ms: u64,

    /// Undo levels kept (0 = unlimited)
    pub history_max_levels: usize,

    pub save_debounce_ms: u64,

    /// What loading a page does with templates that fail to load
    pub missing_template: MissingTemplatePolicy,

    /// Check links and assets before the final save
    pub check_links: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            template_dir: "templates".to_string(),
            draft_dir: ".pagecraft/drafts".to_string(),
            asset_root: "public".to_string(),
            template_ttl_secs: 300,
            history_quiescence_ms: 100,
            history_max_levels: 100,
            save_debounce_ms: 2000,
            missing_template: MissingTemplatePolicy::Skip,
            check_links: true,
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, defaults if there is no config file
    pub fn load(cwd: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = cwd.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: EditorConfig = serde_json::from_str(&content)?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(EditorConfig::default())
        }
    }

    pub fn template_dir(&self, cwd: impl AsRef<Path>) -> PathBuf {
        cwd.as_ref().join(&self.template_dir)
    }

    pub fn draft_dir(&self, cwd: impl AsRef<Path>) -> PathBuf {
        cwd.as_ref().join(&self.draft_dir)
    }

    pub fn asset_root(&self, cwd: impl AsRef<Path>) -> PathBuf {
        cwd.as_ref().join(&self.asset_root)
    }

    pub fn template_ttl(&self) -> Duration {
        Duration::from_secs(self.template_ttl_secs)
    }

    pub fn history_quiescence(&self) -> Duration {
        Duration::from_millis(self.history_quiescence_ms)
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }
}
