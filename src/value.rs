//! Values produced by the rule reader and consumed by the entity writer.
//!
//! A [`Value`] is the only currency between [`crate::reader`] and
//! [`crate::writer`]. List-shaped values carry the [`MergePolicy`] the writer
//! must apply when the destination array already exists.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One destination object of a repeated group, keyed by path relative to the group root.
pub type RepeatableItem = IndexMap<String, Value>;

/// Conflict-resolution strategy for writing into an existing array.
///
/// Only meaningful for [`Value::List`] and [`Value::Repeatable`]; scalar
/// writes always overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergePolicy {
    /// Append incoming elements after the existing ones.
    #[default]
    ExtendExisting,
    /// Replace the existing array wholesale.
    ExchangeExisting,
    /// Remove the existing array.
    DeleteExisting,
    /// Remove every existing element equal to an incoming element.
    DeleteIncoming,
}

/// Result of evaluating one mapping rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No data produced.
    #[default]
    Missing,
    /// A single string. When `removal` is set the destination field is deleted instead.
    Str {
        /// Text to assign.
        text: String,
        /// Marks the destination for deletion.
        removal: bool,
    },
    /// Ordered strings destined for an array path.
    List {
        /// Elements in evaluation order.
        items: Vec<String>,
        /// Merge policy for an existing array.
        policy: MergePolicy,
    },
    /// A boolean leaf.
    Bool(bool),
    /// Objects of a repeated group destined for an array-of-objects path.
    Repeatable {
        /// One entry per destination object.
        items: Vec<RepeatableItem>,
        /// Merge policy for an existing array.
        policy: MergePolicy,
        /// Destination path of the group, e.g. `holdings.holdingsStatements[]`.
        root_path: String,
    },
}

impl Value {
    /// Create a plain string value.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Value::Str {
            text: text.into(),
            removal: false,
        }
    }

    /// Create a deletion marker.
    #[must_use]
    pub fn removal() -> Self {
        Value::Str {
            text: String::new(),
            removal: true,
        }
    }

    /// Create a list value.
    #[must_use]
    pub fn list<I, S>(items: I, policy: MergePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List {
            items: items.into_iter().map(Into::into).collect(),
            policy,
        }
    }

    /// Create a repeatable value.
    #[must_use]
    pub fn repeatable(
        items: Vec<RepeatableItem>,
        policy: MergePolicy,
        root_path: impl Into<String>,
    ) -> Self {
        Value::Repeatable {
            items,
            policy,
            root_path: root_path.into(),
        }
    }

    /// Whether this value writes nothing.
    ///
    /// Blank strings count as missing unless they are deletion markers.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Str { text, removal } => !removal && text.trim().is_empty(),
            Value::List { .. } | Value::Bool(_) | Value::Repeatable { .. } => false,
        }
    }

    /// Whether this value targets an array path.
    #[must_use]
    pub const fn is_array_kind(&self) -> bool {
        matches!(self, Value::List { .. } | Value::Repeatable { .. })
    }

    /// Merge policy carried by list-shaped values.
    #[must_use]
    pub const fn policy(&self) -> Option<MergePolicy> {
        match self {
            Value::List { policy, .. } | Value::Repeatable { policy, .. } => Some(*policy),
            Value::Missing | Value::Str { .. } | Value::Bool(_) => None,
        }
    }

    /// Short variant name for log and error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Str { .. } => "string",
            Value::List { .. } => "list",
            Value::Bool(_) => "boolean",
            Value::Repeatable { .. } => "repeatable",
        }
    }
}
