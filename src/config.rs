// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration handling for notebookbot.
//!
//! Only tunables live here: detection thresholds, the low-information link
//! phrases and the remediation placeholders. Severities and WCAG references
//! come from [`crate::catalogue::Catalogue`] and are not configurable.

use crate::error::{NotebookbotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Detection settings
    #[serde(default)]
    pub rules: RuleSettings,

    /// Remediation settings
    #[serde(default)]
    pub remediation: RemediationSettings,
}

/// Tunables consumed by the detection rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Minimum characters of plain text a neighbouring markdown cell needs
    /// to count as a chart description
    #[serde(default = "default_min_description_chars")]
    pub min_description_chars: usize,

    /// Link labels that say nothing about the destination (case-insensitive)
    #[serde(default = "default_non_descriptive_phrases")]
    pub non_descriptive_phrases: Vec<String>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            min_description_chars: default_min_description_chars(),
            non_descriptive_phrases: default_non_descriptive_phrases(),
        }
    }
}

fn default_min_description_chars() -> usize {
    20
}

fn default_non_descriptive_phrases() -> Vec<String> {
    [
        "here",
        "click here",
        "this link",
        "link",
        "this",
        "read more",
        "more",
        "learn more",
        "this page",
        "go",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Placeholders written by the remediator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationSettings {
    /// Text of the level-1 heading inserted into untitled notebooks
    #[serde(default = "default_title_placeholder")]
    pub title_placeholder: String,

    /// Alt text inserted into images that have none
    #[serde(default = "default_alt_text_placeholder")]
    pub alt_text_placeholder: String,
}

impl Default for RemediationSettings {
    fn default() -> Self {
        Self {
            title_placeholder: default_title_placeholder(),
            alt_text_placeholder: default_alt_text_placeholder(),
        }
    }
}

fn default_title_placeholder() -> String {
    "Untitled Notebook".to_string()
}

fn default_alt_text_placeholder() -> String {
    "Image description needed".to_string()
}

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "notebookbot.toml";

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load configuration from a TOML file; a missing file yields defaults
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| NotebookbotError::Config(format!("TOML parse error: {}", e)))?;

    if config.remediation.alt_text_placeholder.trim().is_empty() {
        return Err(NotebookbotError::Config(
            "remediation.alt_text_placeholder must not be blank".to_string(),
        ));
    }
    if config.remediation.title_placeholder.trim().is_empty() {
        return Err(NotebookbotError::Config(
            "remediation.title_placeholder must not be blank".to_string(),
        ));
    }

    Ok(config)
}

/// Write the default configuration as TOML
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(&Config::default())
        .map_err(|e| NotebookbotError::Config(format!("TOML serialize error: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}
