//! Declarative mapping rules and profiles.
//!
//! A [`MappingProfile`] is an ordered list of [`MappingRule`]s. Each rule maps
//! one source expression to one destination path. Rules are plain data and
//! deserialize from the camelCase JSON documents supplied by the host:
//!
//! ```json
//! {
//!   "mappingRules": [
//!     { "name": "catalogedDate", "path": "instance.catalogedDate", "value": "###TODAY###" },
//!     {
//!       "name": "holdingsStatements",
//!       "path": "holdings.holdingsStatements[]",
//!       "repeatableFieldAction": "EXTEND_EXISTING",
//!       "subfields": [
//!         { "order": 0, "path": "holdings.holdingsStatements[]", "fields": [
//!           { "name": "statement", "path": "holdings.holdingsStatements[].statement", "value": "866$a" }
//!         ] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::error::{MappingError, Result};
use crate::value::MergePolicy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a boolean destination field is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoolAction {
    /// Set the field to `true`.
    AllTrue,
    /// Set the field to `false`.
    AllFalse,
    /// Leave the field as it is.
    AsIs,
    /// Remove the field.
    Remove,
}

/// One declarative instruction mapping a source expression to a destination path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    /// Destination path, e.g. `instance.statisticalCodeIds[]`.
    pub path: String,
    /// Logical field name, used for special handling (grouping, accepted-value enforcement).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source expression.
    #[serde(default, rename = "value", skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Disabled rules are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Inside a repeatable group, a missing required field drops the item.
    #[serde(default)]
    pub required: bool,
    /// Boolean destination action.
    #[serde(
        default,
        rename = "booleanFieldAction",
        skip_serializing_if = "Option::is_none"
    )]
    pub bool_action: Option<BoolAction>,
    /// Merge policy of a repeatable-field rule.
    #[serde(
        default,
        rename = "repeatableFieldAction",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeatable_action: Option<MergePolicy>,
    /// Groups of a repeatable-field rule, one per destination array position.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<RepeatableGroup>,
    /// Destination identifier to display text (`"Main Library (MAIN)"`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub accepted_values: IndexMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

/// One expected destination-array position of a repeatable-field rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatableGroup {
    /// Evaluation order among sibling groups.
    #[serde(default)]
    pub order: i32,
    /// Destination path of the group.
    pub path: String,
    /// Field rules producing the properties of each item.
    #[serde(default)]
    pub fields: Vec<MappingRule>,
}

/// Evaluation path selected for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// A rule with groups and a repeatable action.
    Repeatable,
    /// A rule with an expression and no groups.
    Expression,
    /// A rule that only sets a boolean.
    Boolean,
    /// Nothing to evaluate.
    Empty,
}

impl MappingRule {
    /// Create an enabled expression rule.
    #[must_use]
    pub fn new(path: impl Into<String>, expression: impl Into<String>) -> Self {
        MappingRule {
            path: path.into(),
            name: None,
            expression: Some(expression.into()),
            enabled: true,
            required: false,
            bool_action: None,
            repeatable_action: None,
            subfields: Vec::new(),
            accepted_values: IndexMap::new(),
        }
    }

    /// Create an enabled repeatable-field rule.
    #[must_use]
    pub fn repeatable(
        path: impl Into<String>,
        action: MergePolicy,
        subfields: Vec<RepeatableGroup>,
    ) -> Self {
        MappingRule {
            path: path.into(),
            name: None,
            expression: None,
            enabled: true,
            required: false,
            bool_action: None,
            repeatable_action: Some(action),
            subfields,
            accepted_values: IndexMap::new(),
        }
    }

    /// Create an enabled boolean rule.
    #[must_use]
    pub fn boolean(path: impl Into<String>, action: BoolAction) -> Self {
        MappingRule {
            path: path.into(),
            name: None,
            expression: None,
            enabled: true,
            required: false,
            bool_action: Some(action),
            repeatable_action: None,
            subfields: Vec::new(),
            accepted_values: IndexMap::new(),
        }
    }

    /// Set the logical field name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark the rule as required.
    #[must_use]
    pub const fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Enable or disable the rule.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the merge policy used when the destination array exists.
    #[must_use]
    pub const fn with_repeatable_action(mut self, action: MergePolicy) -> Self {
        self.repeatable_action = Some(action);
        self
    }

    /// Set the accepted values.
    #[must_use]
    pub fn with_accepted_values(mut self, accepted_values: IndexMap<String, String>) -> Self {
        self.accepted_values = accepted_values;
        self
    }

    /// Which evaluation path applies to this rule.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        if !self.subfields.is_empty() && self.repeatable_action.is_some() {
            RuleKind::Repeatable
        } else if self.repeatable_action == Some(MergePolicy::DeleteExisting)
            && self.expression.is_none()
        {
            RuleKind::Repeatable
        } else if self
            .expression
            .as_deref()
            .is_some_and(|expr| !expr.trim().is_empty())
        {
            RuleKind::Expression
        } else if self.bool_action.is_some() {
            RuleKind::Boolean
        } else {
            RuleKind::Empty
        }
    }

    /// Logical name, falling back to the last path segment without array marker.
    #[must_use]
    pub fn field_name(&self) -> &str {
        match &self.name {
            Some(name) => name,
            None => {
                let last = self.path.rsplit('.').next().unwrap_or(&self.path);
                last.strip_suffix("[]").unwrap_or(last)
            }
        }
    }
}

impl RepeatableGroup {
    /// Create a group.
    #[must_use]
    pub fn new(order: i32, path: impl Into<String>, fields: Vec<MappingRule>) -> Self {
        RepeatableGroup {
            order,
            path: path.into(),
            fields,
        }
    }
}

/// An ordered list of mapping rules.
///
/// An absent rule list is a valid state: mapping with such a profile returns
/// the input document unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MappingProfile {
    /// Rules in declaration order, or `None` when the profile carries no rule list.
    #[serde(rename = "mappingRules", default)]
    pub rules: Option<Vec<MappingRule>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileDocument {
    Bare(Vec<MappingRule>),
    Wrapped(MappingProfile),
}

impl MappingProfile {
    /// Create a profile from rules.
    #[must_use]
    pub fn new(rules: Vec<MappingRule>) -> Self {
        MappingProfile { rules: Some(rules) }
    }

    /// Create a profile without a rule list.
    #[must_use]
    pub const fn absent() -> Self {
        MappingProfile { rules: None }
    }

    /// Parse a profile from JSON: either `{"mappingRules": [...]}` or a bare rule array.
    ///
    /// # Errors
    ///
    /// Returns an error if the document matches neither shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: ProfileDocument = serde_json::from_str(json)
            .map_err(|e| MappingError::InvalidProfile(e.to_string()))?;
        Ok(match document {
            ProfileDocument::Wrapped(profile) => profile,
            ProfileDocument::Bare(rules) => MappingProfile::new(rules),
        })
    }

    /// Load a profile from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Enabled rules in declared order; empty for an absent rule list.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &MappingRule> {
        self.rules.iter().flatten().filter(|rule| rule.enabled)
    }
}
