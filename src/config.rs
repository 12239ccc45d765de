//! Configuration options for the mapping core.
//!
//! This module provides the [`MappingConfig`] struct. It is built once at
//! process start and handed to [`crate::MappingPipeline::new`]; the core only
//! reads it.

use crate::error::{MappingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for rule evaluation and entity expansion.
///
/// # Examples
///
/// ```
/// use marc_mapping::MappingConfig;
///
/// let config = MappingConfig::new()
///     .with_holdings_grouping_field("effectiveLocationId")
///     .with_date_patterns(vec!["%Y-%m-%d".to_string()]);
/// assert_eq!(config.holdings_grouping_field, "effectiveLocationId");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingConfig {
    /// Rule name whose distinct values split one holdings record into several.
    pub holdings_grouping_field: String,

    /// Rule names whose values must match an accepted value.
    ///
    /// For these foreign-key-like fields an unmatched value is suppressed
    /// instead of being written raw.
    pub accepted_value_required_fields: Vec<String>,

    /// Date patterns tried in order when normalizing extracted subfield values.
    ///
    /// Patterns use `chrono` format syntax. A value matching one of them is
    /// rewritten as ISO-8601 (`YYYY-MM-DD`).
    pub date_patterns: Vec<String>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            holdings_grouping_field: "permanentLocationId".to_string(),
            accepted_value_required_fields: vec![
                "vendor".to_string(),
                "materialSupplier".to_string(),
                "accessProvider".to_string(),
            ],
            date_patterns: vec![
                "%Y-%m-%d".to_string(),
                "%m/%d/%Y".to_string(),
                "%d.%m.%Y".to_string(),
                "%d-%m-%Y".to_string(),
            ],
        }
    }
}

impl MappingConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a JSON object of the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MappingError::InvalidProfile(e.to_string()))
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Sets the holdings grouping field.
    #[must_use]
    pub fn with_holdings_grouping_field(mut self, name: impl Into<String>) -> Self {
        self.holdings_grouping_field = name.into();
        self
    }

    /// Sets the fields that require an accepted-value match.
    #[must_use]
    pub fn with_accepted_value_required_fields(mut self, names: Vec<String>) -> Self {
        self.accepted_value_required_fields = names;
        self
    }

    /// Sets the date patterns.
    #[must_use]
    pub fn with_date_patterns(mut self, patterns: Vec<String>) -> Self {
        self.date_patterns = patterns;
        self
    }

    /// Whether a rule name requires an accepted-value match.
    #[must_use]
    pub fn requires_accepted_value(&self, name: &str) -> bool {
        self.accepted_value_required_fields
            .iter()
            .any(|field| field == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MappingConfig::default();
        assert_eq!(config.holdings_grouping_field, "permanentLocationId");
        assert!(config.requires_accepted_value("vendor"));
        assert!(!config.requires_accepted_value("title"));
        assert_eq!(config.date_patterns[0], "%Y-%m-%d");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = MappingConfig::from_json_str(r#"{"holdingsGroupingField": "locationId"}"#)
            .unwrap();
        assert_eq!(config.holdings_grouping_field, "locationId");
        assert_eq!(config.date_patterns.len(), 4);
    }

    #[test]
    fn test_builder_pattern() {
        let config = MappingConfig::new()
            .with_accepted_value_required_fields(vec!["acqUnitIds".to_string()])
            .with_date_patterns(Vec::new());
        assert!(config.requires_accepted_value("acqUnitIds"));
        assert!(!config.requires_accepted_value("vendor"));
        assert!(config.date_patterns.is_empty());
    }
}
