#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marc-mapping: profile-driven MARC record mapping
//!
//! Maps MARC-shaped source records into generic entity documents (instances,
//! holdings, items, orders, invoices, authorities) following a declarative
//! mapping profile.
//!
//! ## Quick Start
//!
//! ```
//! use marc_mapping::{
//!     DataField, EntityType, MappingParameters, MappingPipeline, MappingProfile, SourceRecord,
//! };
//! use serde_json::{json, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = MappingProfile::from_json_str(
//!     r#"{"mappingRules": [
//!         {"path": "item.barcode", "value": "945$a"},
//!         {"path": "item.yearCaption[]", "value": "945$y"},
//!         {"path": "item.discoverySuppress", "booleanFieldAction": "ALL_FALSE"}
//!     ]}"#,
//! )?;
//!
//! let record = SourceRecord::builder("00000nam  2200000 a 4500")
//!     .field(
//!         DataField::builder("945", ' ', ' ')
//!             .subfield('a', "31234000123456")
//!             .subfield('y', "2020")
//!             .subfield('y', "2021")
//!             .build(),
//!     )
//!     .build();
//!
//! let outcome = MappingPipeline::default().map(
//!     EntityType::Item,
//!     &profile,
//!     &record,
//!     Value::Null,
//!     &MappingParameters::new(),
//! )?;
//!
//! assert_eq!(
//!     outcome.documents[0],
//!     json!({"item": {
//!         "barcode": "31234000123456",
//!         "yearCaption": ["2020 2021"],
//!         "discoverySuppress": false
//!     }})
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`value`]: Values flowing from reader to writer and merge policies
//! - [`rule`]: Mapping rules and profiles
//! - [`record`]: Source record view (`SourceRecord`, `DataField`, `Subfield`)
//! - [`marcjson`]: MARC-in-JSON input format
//! - [`parameters`]: Reference tables and tenant configuration
//! - [`config`]: Pipeline configuration
//! - [`reader`]: Rule expression evaluation
//! - [`writer`]: Path-addressed document writing
//! - [`entity`]: Destination entity types and their expansion
//! - [`pipeline`]: Mapping orchestration, grouping and batch mapping
//! - [`error`]: Error types and result type

pub mod config;
pub mod entity;
pub mod error;
pub mod marcjson;
pub mod parameters;
pub mod pipeline;
pub mod reader;
/// Source record view (`SourceRecord`, `DataField`, `Subfield`)
pub mod record;
pub mod rule;
pub mod value;
pub mod writer;

pub use config::MappingConfig;
pub use entity::{EntityType, ExpansionPolicy};
pub use error::{MappingError, Result};
pub use parameters::{MappingParameters, ReferenceEntry, TenantConfiguration};
pub use pipeline::{MappingOutcome, MappingPipeline};
pub use reader::{MarcRecordReader, RecordReader};
pub use record::{ControlField, DataField, SourceRecord, Subfield};
pub use rule::{BoolAction, MappingProfile, MappingRule, RepeatableGroup, RuleKind};
pub use value::{MergePolicy, RepeatableItem, Value};
pub use writer::{EntityPath, EntityWriter, JsonEntityWriter};
