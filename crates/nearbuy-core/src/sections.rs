//! Suggestion-section definitions loaded from `config/sections.yaml`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::behaviour::{BehaviourConfig, BehaviourKind};
use crate::ConfigError;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItemDefinition {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDefinition {
    /// Stable identifier used to upsert the section row.
    pub key: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Main category name, resolved to an id when seeding.
    pub main_category: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub items: Vec<SectionItemDefinition>,
}

impl SectionDefinition {
    /// Typed config for this section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` when the type is unknown or the config
    /// does not fit it.
    pub fn behaviour_config(&self) -> Result<BehaviourConfig, ConfigError> {
        let kind: BehaviourKind = self
            .kind
            .parse()
            .map_err(|e| ConfigError::Validation(format!("section '{}': {e}", self.key)))?;
        BehaviourConfig::parse(kind, &self.config)
            .map_err(|e| ConfigError::Validation(format!("section '{}': {e}", self.key)))
    }
}

#[derive(Debug, Deserialize)]
pub struct SectionsFile {
    pub sections: Vec<SectionDefinition>,
}

/// Load and validate the section definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sections(path: &Path) -> Result<SectionsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SectionsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sections(&content)
}

/// Parse and validate section definitions from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text cannot be parsed or fails validation.
pub fn parse_sections(content: &str) -> Result<SectionsFile, ConfigError> {
    let sections_file: SectionsFile =
        serde_yaml::from_str(content).map_err(ConfigError::SectionsFileParse)?;

    validate_sections(&sections_file)?;

    Ok(sections_file)
}

fn validate_sections(sections_file: &SectionsFile) -> Result<(), ConfigError> {
    let mut seen_keys = HashSet::new();

    for section in &sections_file.sections {
        if section.key.is_empty()
            || !section
                .key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ConfigError::Validation(format!(
                "section key '{}' must be non-empty lowercase letters, digits or '-'",
                section.key
            )));
        }

        if !seen_keys.insert(section.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate section key: '{}'",
                section.key
            )));
        }

        if section.title.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "section '{}' has an empty title",
                section.key
            )));
        }

        let config = section.behaviour_config()?;

        if config.kind() == BehaviourKind::CategoryBased
            && section
                .main_category
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "section '{}' is CATEGORY_BASED but names no main_category",
                section.key
            )));
        }

        if let Some(item) = section.items.iter().find(|i| i.title.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "section '{}' has an item with an empty title (subtitle: {:?})",
                section.key, item.subtitle
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sections_test.rs"]
mod tests;
