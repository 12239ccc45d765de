//! Reference data supplied with each mapping invocation.
//!
//! [`MappingParameters`] bundles read-only lookup tables (locations,
//! identifier types, note types, ...) and the tenant configuration. The core
//! never mutates it; concurrent invocations may share one instance.

use crate::error::{MappingError, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of a reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Destination identifier
    pub id: String,
    /// Short code, when the table has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Display name
    pub name: String,
}

impl ReferenceEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(id: impl Into<String>, code: Option<&str>, name: impl Into<String>) -> Self {
        ReferenceEntry {
            id: id.into(),
            code: code.map(str::to_string),
            name: name.into(),
        }
    }

    /// Display text in the `Name (Code)` convention, or just the name.
    #[must_use]
    pub fn display(&self) -> String {
        match &self.code {
            Some(code) => format!("{} ({})", self.name, code),
            None => self.name.clone(),
        }
    }
}

/// Tenant-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfiguration {
    /// IANA timezone used to resolve `###TODAY###`; blank or absent means UTC
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time_zone: Option<String>,
}

impl TenantConfiguration {
    /// Configuration with the given timezone.
    #[must_use]
    pub fn with_timezone(zone: impl Into<String>) -> Self {
        TenantConfiguration {
            date_time_zone: Some(zone.into()),
        }
    }

    /// Resolve the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidTimezone`] if the zone name is not a known IANA zone.
    pub fn timezone(&self) -> Result<Tz> {
        match self.date_time_zone.as_deref().map(str::trim) {
            None | Some("") => Ok(Tz::UTC),
            Some(zone) => zone
                .parse::<Tz>()
                .map_err(|e| MappingError::InvalidTimezone(format!("{zone}: {e}"))),
        }
    }

    /// Current date in the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the timezone cannot be resolved.
    pub fn today(&self) -> Result<NaiveDate> {
        let zone = self.timezone()?;
        Ok(chrono::Utc::now().with_timezone(&zone).date_naive())
    }
}

/// Read-only reference data for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingParameters {
    /// Lookup tables keyed by table name (`locations`, `identifierTypes`, ...)
    #[serde(default)]
    pub tables: IndexMap<String, Vec<ReferenceEntry>>,
    /// Tenant settings
    #[serde(default)]
    pub tenant_configuration: TenantConfiguration,
}

impl MappingParameters {
    /// Empty parameters with UTC as tenant timezone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MappingError::InvalidParameters(e.to_string()))
    }

    /// Add or replace a lookup table.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, entries: Vec<ReferenceEntry>) -> Self {
        self.tables.insert(name.into(), entries);
        self
    }

    /// Set the tenant configuration.
    #[must_use]
    pub fn with_tenant_configuration(mut self, configuration: TenantConfiguration) -> Self {
        self.tenant_configuration = configuration;
        self
    }

    /// Rows of a lookup table; empty if the table is unknown.
    #[must_use]
    pub fn table(&self, name: &str) -> &[ReferenceEntry] {
        self.tables.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Accepted values for a rule built from a lookup table: `id -> "Name (Code)"`.
    #[must_use]
    pub fn accepted_values(&self, table: &str) -> IndexMap<String, String> {
        self.table(table)
            .iter()
            .map(|entry| (entry.id.clone(), entry.display()))
            .collect()
    }
}
