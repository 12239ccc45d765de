//! Read-only view of a source record.
//!
//! This module provides the record types the rule reader consumes:
//! - [`SourceRecord`]: leader, control fields and data fields in source order
//! - [`ControlField`]: tags 001-009 carrying raw data
//! - [`DataField`]: tags 010+ with two indicators and subfields
//! - [`Subfield`]: a single-character coded value inside a data field
//!
//! Records are decoded elsewhere (see [`crate::marcjson`]) and are never
//! mutated once a mapping run starts. Unlike a keyed field store, fields keep
//! their global source order: repeated tags are legal and their order drives
//! positional fan-out.
//!
//! # Examples
//!
//! ```
//! use marc_mapping::{DataField, SourceRecord};
//!
//! let record = SourceRecord::builder("00000nam  2200000 a 4500")
//!     .control_field("001", "in00001")
//!     .field(
//!         DataField::builder("245", '1', '0')
//!             .subfield('a', "The Great Gatsby")
//!             .build(),
//!     )
//!     .build();
//!
//! assert_eq!(record.fields_by_tag("245").count(), 1);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A source record: leader, control fields and data fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Fixed-width record leader (24 characters for MARC)
    pub leader: String,
    /// Control fields (001-009) in source order
    pub control_fields: Vec<ControlField>,
    /// Data fields (010+) in source order
    pub data_fields: Vec<DataField>,
}

/// A control field (001-009)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlField {
    /// Field tag (3 digits)
    pub tag: String,
    /// Raw field data
    pub data: String,
}

/// A data field in a source record (fields 010 and higher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    /// Field tag (3 digits)
    pub tag: String,
    /// First indicator
    pub indicator1: char,
    /// Second indicator
    pub indicator2: char,
    /// Subfields (stored in `SmallVec` to avoid allocation for typical fields with 4 or fewer subfields)
    pub subfields: SmallVec<[Subfield; 4]>,
}

/// A subfield within a data field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character)
    pub code: char,
    /// Subfield value
    pub value: String,
}

/// Whether a tag addresses a control field.
#[must_use]
pub fn is_control_tag(tag: &str) -> bool {
    tag.len() == 3 && tag.as_bytes()[0] == b'0' && tag.as_bytes()[1] == b'0'
}

impl SourceRecord {
    /// Create an empty record with the given leader
    #[must_use]
    pub fn new(leader: impl Into<String>) -> Self {
        SourceRecord {
            leader: leader.into(),
            control_fields: Vec::new(),
            data_fields: Vec::new(),
        }
    }

    /// Create a builder for fluently constructing records
    #[must_use]
    pub fn builder(leader: impl Into<String>) -> SourceRecordBuilder {
        SourceRecordBuilder {
            record: SourceRecord::new(leader),
        }
    }

    /// Add a control field
    pub fn add_control_field(&mut self, tag: impl Into<String>, data: impl Into<String>) {
        self.control_fields.push(ControlField {
            tag: tag.into(),
            data: data.into(),
        });
    }

    /// Add a data field
    pub fn add_field(&mut self, field: DataField) {
        self.data_fields.push(field);
    }

    /// Iterate over control fields matching a tag, in source order
    pub fn control_fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ControlField> {
        self.control_fields.iter().filter(move |field| field.tag == tag)
    }

    /// Get the first control field value for a tag
    #[must_use]
    pub fn get_control_field<'a>(&'a self, tag: &'a str) -> Option<&'a str> {
        self.control_fields_by_tag(tag)
            .next()
            .map(|field| field.data.as_str())
    }

    /// Iterate over data fields matching a tag, in source order
    ///
    /// # Examples
    ///
    /// ```ignore
    /// for field in record.fields_by_tag("945") {
    ///     if let Some(barcode) = field.get_subfield('a') {
    ///         println!("Barcode: {}", barcode);
    ///     }
    /// }
    /// ```
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DataField> {
        self.data_fields.iter().filter(move |field| field.tag == tag)
    }

    /// Number of occurrences of a tag, control or data
    #[must_use]
    pub fn occurrence_count(&self, tag: &str) -> usize {
        if is_control_tag(tag) {
            self.control_fields_by_tag(tag).count()
        } else {
            self.fields_by_tag(tag).count()
        }
    }

    /// A copy of this record keeping only the `index`-th occurrence of `tag`.
    ///
    /// Every other field is kept as is. Returns `None` when the occurrence does
    /// not exist.
    #[must_use]
    pub fn with_single_occurrence(&self, tag: &str, index: usize) -> Option<SourceRecord> {
        if index >= self.occurrence_count(tag) {
            return None;
        }

        let mut seen = 0;
        let mut keep = |field_tag: &str| {
            if field_tag != tag {
                return true;
            }
            seen += 1;
            seen - 1 == index
        };

        let mut record = SourceRecord::new(self.leader.clone());
        for field in &self.control_fields {
            if keep(&field.tag) {
                record.control_fields.push(field.clone());
            }
        }
        for field in &self.data_fields {
            if keep(&field.tag) {
                record.data_fields.push(field.clone());
            }
        }
        Some(record)
    }
}

/// Builder for fluently constructing source records
#[derive(Debug)]
pub struct SourceRecordBuilder {
    record: SourceRecord,
}

impl SourceRecordBuilder {
    /// Add a control field
    #[must_use]
    pub fn control_field(mut self, tag: &str, data: &str) -> Self {
        self.record.add_control_field(tag, data);
        self
    }

    /// Add a data field
    #[must_use]
    pub fn field(mut self, field: DataField) -> Self {
        self.record.add_field(field);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> SourceRecord {
        self.record
    }
}

impl DataField {
    /// Create a new data field
    #[must_use]
    pub fn new(tag: impl Into<String>, indicator1: char, indicator2: char) -> Self {
        DataField {
            tag: tag.into(),
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Create a builder for constructing fields fluently
    ///
    /// # Examples
    ///
    /// ```
    /// use marc_mapping::DataField;
    ///
    /// let field = DataField::builder("945", ' ', ' ')
    ///     .subfield('a', "31234000123456")
    ///     .subfield('h', "MAIN")
    ///     .build();
    /// assert_eq!(field.get_subfield('h'), Some("MAIN"));
    /// ```
    #[must_use]
    pub fn builder(tag: impl Into<String>, indicator1: char, indicator2: char) -> DataFieldBuilder {
        DataFieldBuilder {
            field: DataField::new(tag, indicator1, indicator2),
        }
    }

    /// Add a subfield
    pub fn add_subfield(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Get first value for a subfield code
    #[must_use]
    pub fn get_subfield(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|sf| sf.code == code)
            .map(|sf| sf.value.as_str())
    }

    /// Get all subfield values matching any of the given codes
    ///
    /// Returns values in the order they appear in the field.
    #[must_use]
    pub fn get_subfields(&self, codes: &[char]) -> Vec<&str> {
        self.subfields
            .iter()
            .filter(|sf| codes.contains(&sf.code))
            .map(|sf| sf.value.as_str())
            .collect()
    }

    /// Concatenate all subfield values with spaces
    #[must_use]
    pub fn value(&self) -> String {
        self.subfields
            .iter()
            .map(|sf| sf.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for fluently constructing data fields
#[derive(Debug)]
pub struct DataFieldBuilder {
    field: DataField,
}

impl DataFieldBuilder {
    /// Add a subfield
    #[must_use]
    pub fn subfield(mut self, code: char, value: &str) -> Self {
        self.field.add_subfield(code, value);
        self
    }

    /// Build the field
    #[must_use]
    pub fn build(self) -> DataField {
        self.field
    }
}
