//! Profile-driven mapping of one record into one or more entity documents.
//!
//! [`MappingPipeline::map`] runs the rules of a [`MappingProfile`] in declared
//! order against a [`SourceRecord`], writing each result into the entity
//! document. Two expansions turn one run into several documents:
//!
//! - **Grouping** (holdings): the rule producing the grouping field is held
//!   out of the main pass. The document built by the other rules is cloned
//!   once per distinct grouping value, the value stamped into each clone. The
//!   full ordered list of values is reported in
//!   [`MappingOutcome::generated_ids`].
//! - **Per occurrence** (items): [`MappingPipeline::map_per_occurrence`] maps
//!   the record once per occurrence of a tag chosen by the caller.
//!
//! A profile without a rule list leaves the input document unchanged.
//!
//! # Examples
//!
//! ```
//! use marc_mapping::{
//!     DataField, EntityType, MappingParameters, MappingPipeline, MappingProfile, MappingRule,
//!     SourceRecord,
//! };
//! use serde_json::{json, Value};
//!
//! let record = SourceRecord::builder("00000nam  2200000 a 4500")
//!     .field(DataField::builder("245", '1', '0').subfield('a', "Walden").build())
//!     .build();
//! let profile = MappingProfile::new(vec![MappingRule::new("instance.title", "245$a")]);
//!
//! let outcome = MappingPipeline::default().map(
//!     EntityType::Instance,
//!     &profile,
//!     &record,
//!     Value::Null,
//!     &MappingParameters::new(),
//! )?;
//! assert_eq!(outcome.documents, vec![json!({"instance": {"title": "Walden"}})]);
//! # Ok::<(), marc_mapping::MappingError>(())
//! ```

use crate::config::MappingConfig;
use crate::entity::{EntityType, ExpansionPolicy};
use crate::error::Result;
use crate::parameters::MappingParameters;
use crate::reader::{MarcRecordReader, RecordReader};
use crate::record::SourceRecord;
use crate::rule::{MappingProfile, MappingRule};
use crate::value::Value;
use crate::writer::{EntityWriter, JsonEntityWriter};
use indexmap::IndexSet;
use serde_json::Value as Json;
use tracing::{debug, error, trace};

/// Progress of one mapping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Uninitialized,
    ReaderBound,
    WriterBound,
    RulesApplied,
    Expanded,
    Finalized,
}

impl Stage {
    fn advance(self, next: Stage, entity: EntityType) -> Stage {
        trace!(%entity, from = ?self, to = ?next, "mapping stage");
        next
    }
}

/// Documents produced by one mapping run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingOutcome {
    /// Entity documents, keyed by entity root (`{"holdings": {...}}`)
    pub documents: Vec<Json>,
    /// Grouping values in source order, duplicates kept
    pub generated_ids: Vec<String>,
}

impl MappingOutcome {
    fn single(document: Json) -> Self {
        MappingOutcome {
            documents: vec![document],
            generated_ids: Vec::new(),
        }
    }

    /// Serialize every document.
    ///
    /// # Errors
    ///
    /// Returns an error if a document fails to serialize.
    pub fn serialize(&self) -> Result<Vec<String>> {
        self.documents
            .iter()
            .map(|document| Ok(serde_json::to_string(document)?))
            .collect()
    }

    fn absorb(&mut self, other: MappingOutcome) {
        self.documents.extend(other.documents);
        self.generated_ids.extend(other.generated_ids);
    }
}

/// Runs mapping profiles against source records.
#[derive(Debug, Clone, Default)]
pub struct MappingPipeline {
    config: MappingConfig,
}

impl MappingPipeline {
    /// Create a pipeline with the given configuration.
    #[must_use]
    pub fn new(config: MappingConfig) -> Self {
        MappingPipeline { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// Map one record into the entity document.
    ///
    /// `document` is the existing keyed document (`{"instance": {...}}`) or
    /// `null` to start from scratch.
    ///
    /// # Errors
    ///
    /// Returns fatal errors: a malformed destination path, a value/path kind
    /// mismatch, or an unresolvable tenant timezone. Rule expressions that fail
    /// to parse are logged and skipped.
    pub fn map(
        &self,
        entity: EntityType,
        profile: &MappingProfile,
        record: &SourceRecord,
        document: Json,
        parameters: &MappingParameters,
    ) -> Result<MappingOutcome> {
        let Some(rules) = profile.rules.as_deref() else {
            debug!(%entity, "profile has no rules; document returned unchanged");
            return Ok(MappingOutcome::single(document));
        };

        let mut stage = Stage::Uninitialized;
        let reader = MarcRecordReader::new(record, parameters, &self.config);
        stage = stage.advance(Stage::ReaderBound, entity);
        let mut writer = JsonEntityWriter::for_entity(entity, document);
        stage = stage.advance(Stage::WriterBound, entity);

        let grouping = match entity.expansion_policy(&self.config) {
            ExpansionPolicy::Grouping { field } => rules
                .iter()
                .position(|rule| rule.enabled && is_grouping_rule(rule, &field))
                .map(|index| (index, field)),
            ExpansionPolicy::Single | ExpansionPolicy::PerOccurrence => None,
        };

        for (index, rule) in rules.iter().enumerate() {
            if !rule.enabled || grouping.as_ref().is_some_and(|(held, _)| *held == index) {
                continue;
            }
            let value = reader.read(rule)?;
            write_rule(&mut writer, rule, &value)?;
        }
        stage = stage.advance(Stage::RulesApplied, entity);

        let Some((index, field)) = grouping else {
            stage.advance(Stage::Finalized, entity);
            return Ok(MappingOutcome::single(writer.into_document()));
        };

        let value = reader.read_grouping(&rules[index])?;
        let generated_ids = grouping_values(&value, &field);
        if generated_ids.is_empty() {
            stage.advance(Stage::Finalized, entity);
            return Ok(MappingOutcome::single(writer.into_document()));
        }

        let distinct: IndexSet<&String> = generated_ids.iter().collect();
        let stamp_path = format!("{}.{field}", entity.root_key());
        let base = writer.into_document();
        let mut documents = Vec::with_capacity(distinct.len());
        for id in distinct {
            let mut clone = JsonEntityWriter::for_entity(entity, base.clone());
            clone.write(&stamp_path, &Value::string(id.as_str()))?;
            documents.push(clone.into_document());
        }
        stage.advance(Stage::Expanded, entity);
        debug!(%entity, documents = documents.len(), ids = generated_ids.len(), "grouping expansion");

        Ok(MappingOutcome {
            documents,
            generated_ids,
        })
    }

    /// Map a record once per occurrence of `tag`.
    ///
    /// Each run sees the record with only one occurrence of `tag`; every other
    /// field is kept. A record without the tag is mapped once as is.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of any run.
    pub fn map_per_occurrence(
        &self,
        entity: EntityType,
        profile: &MappingProfile,
        record: &SourceRecord,
        document: &Json,
        parameters: &MappingParameters,
        tag: &str,
    ) -> Result<MappingOutcome> {
        let count = record.occurrence_count(tag);
        if profile.rules.is_none() || count == 0 {
            return self.map(entity, profile, record, document.clone(), parameters);
        }

        let mut outcome = MappingOutcome::default();
        for index in 0..count {
            let Some(occurrence) = record.with_single_occurrence(tag, index) else {
                continue;
            };
            outcome.absorb(self.map(entity, profile, &occurrence, document.clone(), parameters)?);
        }
        debug!(%entity, tag, documents = outcome.documents.len(), "per-occurrence expansion");
        Ok(outcome)
    }

    /// Map many records in parallel, each from an empty document.
    ///
    /// Outcomes come back in input order.
    ///
    /// # Errors
    ///
    /// Returns a fatal error from any record; the remaining results are discarded.
    pub fn map_batch(
        &self,
        entity: EntityType,
        profile: &MappingProfile,
        records: &[SourceRecord],
        parameters: &MappingParameters,
    ) -> Result<Vec<MappingOutcome>> {
        use rayon::prelude::*;

        records
            .par_iter()
            .map(|record| self.map(entity, profile, record, Json::Null, parameters))
            .collect()
    }
}

/// Write one evaluated rule, logging fatal writer errors.
fn write_rule(writer: &mut JsonEntityWriter, rule: &MappingRule, value: &Value) -> Result<()> {
    if value.is_missing() {
        return Ok(());
    }
    let written = match rule.repeatable_action {
        Some(policy) if value.is_array_kind() => writer.write_with_policy(&rule.path, value, policy),
        _ => writer.write(&rule.path, value),
    };
    written.map_err(|err| {
        error!(path = %rule.path, error = %err, "mapping aborted");
        err
    })
}

/// Whether a rule produces the grouping field, directly or inside a group.
fn is_grouping_rule(rule: &MappingRule, field: &str) -> bool {
    rule.field_name() == field
        || rule
            .subfields
            .iter()
            .flat_map(|group| &group.fields)
            .any(|nested| nested.field_name() == field)
}

/// Non-blank grouping values in production order.
fn grouping_values(value: &Value, field: &str) -> Vec<String> {
    let suffix = format!(".{field}");
    let values: Vec<String> = match value {
        Value::Str { text, removal: false } => vec![text.clone()],
        Value::List { items, .. } => items.clone(),
        Value::Repeatable { items, .. } => items
            .iter()
            .flat_map(|item| item.iter())
            .filter(|(key, _)| key.as_str() == field || key.ends_with(&suffix))
            .filter_map(|(_, value)| match value {
                Value::Str { text, removal: false } => Some(text.clone()),
                _ => None,
            })
            .collect(),
        Value::Str { .. } | Value::Bool(_) | Value::Missing => Vec::new(),
    };
    values
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DataField;
    use crate::rule::RepeatableGroup;
    use crate::value::MergePolicy;
    use serde_json::json;

    fn holdings_record(locations: &[&str]) -> SourceRecord {
        let mut builder = SourceRecord::builder("00000nx   2200000 a 4500");
        for location in locations {
            builder = builder.field(
                DataField::builder("945", ' ', ' ')
                    .subfield('h', location)
                    .subfield('a', "call")
                    .build(),
            );
        }
        builder.build()
    }

    fn grouping_rule() -> MappingRule {
        let path = "holdings.items[]";
        MappingRule::repeatable(
            path,
            MergePolicy::ExtendExisting,
            vec![RepeatableGroup::new(
                0,
                path,
                vec![MappingRule::new(format!("{path}.permanentLocationId"), "945$h")],
            )],
        )
    }

    #[test]
    fn test_grouping_values_from_repeatable() {
        let mut item = crate::value::RepeatableItem::new();
        item.insert("permanentLocationId".into(), Value::string("L1"));
        item.insert("other".into(), Value::string("x"));
        let mut nested = crate::value::RepeatableItem::new();
        nested.insert("location.permanentLocationId".into(), Value::string("L2"));
        let value = Value::repeatable(vec![item, nested], MergePolicy::ExtendExisting, "h[]");
        assert_eq!(grouping_values(&value, "permanentLocationId"), vec!["L1", "L2"]);

        assert_eq!(
            grouping_values(&Value::list(["a", " ", "a"], MergePolicy::ExtendExisting), "f"),
            vec!["a", "a"]
        );
        assert!(grouping_values(&Value::removal(), "f").is_empty());
    }

    #[test]
    fn test_grouping_expansion() {
        let profile = MappingProfile::new(vec![
            MappingRule::new("holdings.callNumber", "945$a"),
            grouping_rule(),
        ]);
        let outcome = MappingPipeline::default()
            .map(
                EntityType::Holdings,
                &profile,
                &holdings_record(&["L1", "L2", "L1"]),
                Json::Null,
                &MappingParameters::new(),
            )
            .unwrap();

        assert_eq!(outcome.generated_ids, vec!["L1", "L2", "L1"]);
        assert_eq!(
            outcome.documents,
            vec![
                json!({"holdings": {"callNumber": "call", "permanentLocationId": "L1"}}),
                json!({"holdings": {"callNumber": "call", "permanentLocationId": "L2"}}),
            ]
        );
    }

    #[test]
    fn test_grouping_without_values_returns_base() {
        let profile = MappingProfile::new(vec![
            MappingRule::new("holdings.callNumber", "945$a"),
            MappingRule::new("holdings.permanentLocationId", "852$b"),
        ]);
        let outcome = MappingPipeline::default()
            .map(
                EntityType::Holdings,
                &profile,
                &holdings_record(&["L1"]),
                Json::Null,
                &MappingParameters::new(),
            )
            .unwrap();
        assert_eq!(outcome.documents, vec![json!({"holdings": {"callNumber": "call"}})]);
        assert!(outcome.generated_ids.is_empty());
    }

    #[test]
    fn test_grouping_field_is_plain_rule_for_other_entities() {
        let profile = MappingProfile::new(vec![MappingRule::new("instance.permanentLocationId", "945$h")]);
        let outcome = MappingPipeline::default()
            .map(
                EntityType::Instance,
                &profile,
                &holdings_record(&["L1", "L2"]),
                Json::Null,
                &MappingParameters::new(),
            )
            .unwrap();
        assert_eq!(outcome.documents, vec![json!({"instance": {"permanentLocationId": "L1"}})]);
    }

    #[test]
    fn test_absent_rules_return_input() {
        let input = json!({"instance": {"title": "kept"}});
        let outcome = MappingPipeline::default()
            .map(
                EntityType::Instance,
                &MappingProfile::absent(),
                &holdings_record(&[]),
                input.clone(),
                &MappingParameters::new(),
            )
            .unwrap();
        assert_eq!(outcome, MappingOutcome::single(input));
    }

    #[test]
    fn test_serialize_outcome() {
        let outcome = MappingOutcome::single(json!({"item": {"barcode": "b1"}}));
        assert_eq!(outcome.serialize().unwrap(), vec![r#"{"item":{"barcode":"b1"}}"#.to_string()]);
    }

    #[test]
    fn test_stage_advance() {
        assert_eq!(
            Stage::Uninitialized.advance(Stage::ReaderBound, EntityType::Item),
            Stage::ReaderBound
        );
    }
}
