//! Destination entity types.
//!
//! The entity type selects the root key of the output document and the
//! expansion applied after the rules ran:
//!
//! - holdings are split by the distinct values of a grouping field
//! - items are produced once per occurrence of a host-signalled tag
//! - everything else maps one record to one document

use crate::config::MappingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of entity a mapping run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Bibliographic instance
    Instance,
    /// Holdings record
    Holdings,
    /// Item
    Item,
    /// Purchase order
    Order,
    /// Invoice
    Invoice,
    /// Authority record
    Authority,
}

/// Expansion applied after the rule pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpansionPolicy {
    /// One document per record.
    Single,
    /// One document per distinct value of the named rule.
    Grouping {
        /// Rule name whose values split the document
        field: String,
    },
    /// One document per occurrence of a tag chosen by the host.
    PerOccurrence,
}

impl EntityType {
    /// Root key of the output document, e.g. `holdings`.
    #[must_use]
    pub const fn root_key(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Holdings => "holdings",
            Self::Item => "item",
            Self::Order => "order",
            Self::Invoice => "invoice",
            Self::Authority => "authority",
        }
    }

    /// Expansion this entity type uses.
    #[must_use]
    pub fn expansion_policy(&self, config: &MappingConfig) -> ExpansionPolicy {
        match self {
            Self::Holdings => ExpansionPolicy::Grouping {
                field: config.holdings_grouping_field.clone(),
            },
            Self::Item => ExpansionPolicy::PerOccurrence,
            Self::Instance | Self::Order | Self::Invoice | Self::Authority => {
                ExpansionPolicy::Single
            }
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root_key())
    }
}
