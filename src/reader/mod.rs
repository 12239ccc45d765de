//! Rule expression evaluation against a source record.
//!
//! The reader turns one [`MappingRule`] into one [`Value`]:
//!
//! - expression rules are parsed by [`expression`] and evaluated clause by
//!   clause until one produces a non-blank result
//! - extracted values pass through the [`transform`]s (date normalization,
//!   accepted values)
//! - repeatable-field rules are exploded into destination objects by
//!   [`repeatable`]
//!
//! # Fan-out
//!
//! Rules targeting an array path (`...[]`), and rules nested inside a
//! repeatable group, read every occurrence of a repeated tag. A token whose
//! occurrences line up one-to-one with the values produced so far is
//! correlated by position; otherwise its values are appended. Other rules read
//! only the first occurrence and concatenate token results.
//!
//! # Errors
//!
//! A malformed expression is logged and the rule yields [`Value::Missing`].
//! Fatal errors (an unresolvable tenant timezone) are returned.
//!
//! # Examples
//!
//! ```
//! use marc_mapping::{DataField, MappingConfig, MappingParameters, MappingRule, SourceRecord, Value};
//! use marc_mapping::reader::{MarcRecordReader, RecordReader};
//!
//! let record = SourceRecord::builder("00000nam  2200000 a 4500")
//!     .field(DataField::builder("945", ' ', ' ').subfield('a', "b1").build())
//!     .field(DataField::builder("945", ' ', ' ').subfield('a', "b2").build())
//!     .build();
//! let parameters = MappingParameters::new();
//! let config = MappingConfig::default();
//! let reader = MarcRecordReader::new(&record, &parameters, &config);
//!
//! let scalar = reader.read(&MappingRule::new("item.barcode", "945$a"))?;
//! assert_eq!(scalar, Value::string("b1"));
//!
//! let list = reader.read(&MappingRule::new("item.formerIds[]", "945$a"))?;
//! assert_eq!(list, Value::list(["b1", "b2"], Default::default()));
//! # Ok::<(), marc_mapping::MappingError>(())
//! ```

pub mod expression;
pub mod repeatable;
pub mod transform;

use crate::config::MappingConfig;
use crate::error::{MappingError, Result};
use crate::parameters::MappingParameters;
use crate::record::{is_control_tag, SourceRecord};
use crate::rule::{BoolAction, MappingRule, RuleKind};
use crate::value::Value;
use expression::{Clause, Expression, Token, LEADER_TAG};
use tracing::{debug, warn};
use transform::{Transform, ISO_DATE_FORMAT};

/// Trait for evaluating mapping rules against one record.
pub trait RecordReader {
    /// Evaluate a top-level rule.
    ///
    /// # Errors
    ///
    /// Returns only fatal errors; expression problems degrade to [`Value::Missing`].
    fn read(&self, rule: &MappingRule) -> Result<Value>;

    /// Evaluate a grouping rule with fan-out forced on, so every occurrence counts.
    ///
    /// # Errors
    ///
    /// Same as [`RecordReader::read`].
    fn read_grouping(&self, rule: &MappingRule) -> Result<Value>;
}

/// Evaluate a single rule against a record.
///
/// # Errors
///
/// Returns only fatal errors; see [`RecordReader::read`].
pub fn evaluate(
    record: &SourceRecord,
    rule: &MappingRule,
    parameters: &MappingParameters,
    config: &MappingConfig,
) -> Result<Value> {
    MarcRecordReader::new(record, parameters, config).read(rule)
}

/// Reader over a MARC-shaped [`SourceRecord`].
#[derive(Debug, Clone, Copy)]
pub struct MarcRecordReader<'a> {
    record: &'a SourceRecord,
    parameters: &'a MappingParameters,
    config: &'a MappingConfig,
}

/// Outcome of one clause.
#[derive(Debug, PartialEq)]
enum ClauseResult {
    Removal,
    Scalar(String),
    Items(Vec<String>),
}

impl ClauseResult {
    fn is_blank(&self) -> bool {
        match self {
            ClauseResult::Removal => false,
            ClauseResult::Scalar(text) => text.trim().is_empty(),
            ClauseResult::Items(items) => items.is_empty(),
        }
    }
}

/// Values extracted by one token, before transforms.
struct Extracted {
    values: Vec<String>,
    from_subfields: bool,
}

impl<'a> MarcRecordReader<'a> {
    /// Bind a reader to a record and its reference data.
    #[must_use]
    pub fn new(
        record: &'a SourceRecord,
        parameters: &'a MappingParameters,
        config: &'a MappingConfig,
    ) -> Self {
        MarcRecordReader {
            record,
            parameters,
            config,
        }
    }

    /// A reader over another record sharing this reader's reference data.
    pub(crate) fn scoped<'b>(&self, record: &'b SourceRecord) -> MarcRecordReader<'b>
    where
        'a: 'b,
    {
        MarcRecordReader::new(record, self.parameters, self.config)
    }

    /// Evaluate a rule nested in a repeatable group; fan-out is always on.
    pub(crate) fn read_nested(&self, rule: &MappingRule) -> Result<Value> {
        self.read_with(rule, true)
    }

    fn read_with(&self, rule: &MappingRule, fan_out: bool) -> Result<Value> {
        let value = match rule.kind() {
            RuleKind::Repeatable => repeatable::read_repeatable(self, rule)?,
            RuleKind::Expression => self.read_expression(rule, fan_out)?,
            RuleKind::Boolean => bool_value(rule.bool_action),
            RuleKind::Empty => Value::Missing,
        };
        debug!(path = %rule.path, kind = value.kind(), "rule evaluated");
        Ok(value)
    }

    fn read_expression(&self, rule: &MappingRule, fan_out: bool) -> Result<Value> {
        let Some(text) = rule.expression.as_deref() else {
            return Ok(Value::Missing);
        };
        let array_target = rule.path.ends_with("[]");

        match self.evaluate_expression(rule, text, fan_out || array_target) {
            Ok(ClauseResult::Removal) => Ok(Value::removal()),
            Ok(ClauseResult::Scalar(text)) if text.trim().is_empty() => Ok(Value::Missing),
            Ok(ClauseResult::Scalar(text)) => Ok(Value::string(text)),
            Ok(ClauseResult::Items(items)) if items.is_empty() => Ok(Value::Missing),
            Ok(ClauseResult::Items(items)) => Ok(Value::List {
                items,
                policy: rule.repeatable_action.unwrap_or_default(),
            }),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                warn!(path = %rule.path, expression = text, error = %err, "rule skipped");
                Ok(Value::Missing)
            }
        }
    }

    fn evaluate_expression(&self, rule: &MappingRule, text: &str, fan_out: bool) -> Result<ClauseResult> {
        let expression = Expression::parse(text)?;
        for clause in &expression.clauses {
            let result = self.evaluate_clause(rule, clause, fan_out)?;
            if !result.is_blank() {
                return Ok(result);
            }
        }
        Ok(if fan_out {
            ClauseResult::Items(Vec::new())
        } else {
            ClauseResult::Scalar(String::new())
        })
    }

    fn evaluate_clause(&self, rule: &MappingRule, clause: &Clause, fan_out: bool) -> Result<ClauseResult> {
        let accepted = Transform::AcceptedValues {
            accepted: &rule.accepted_values,
            strict: self.config.requires_accepted_value(rule.field_name()),
        };
        let dates = Transform::NormalizeDate {
            patterns: &self.config.date_patterns,
        };

        let mut scalar = String::new();
        let mut items: Vec<String> = Vec::new();

        for token in &clause.tokens {
            let values: Vec<String> = match token {
                Token::Remove => return Ok(ClauseResult::Removal),
                Token::Today => vec![self.today()?],
                Token::Literal(text) => vec![accepted.apply(text)],
                Token::Field { .. } | Token::ByteRange { .. } => {
                    let extracted = self.extract(token)?;
                    extracted
                        .values
                        .iter()
                        .map(|raw| {
                            if extracted.from_subfields {
                                accepted.apply(&dates.apply(raw))
                            } else {
                                accepted.apply(raw)
                            }
                        })
                        .filter(|value| !value.trim().is_empty())
                        .collect()
                }
            };

            if fan_out {
                correlate(
                    &mut items,
                    values.into_iter().filter(|v| !v.trim().is_empty()).collect(),
                );
            } else if let Some(first) = values.into_iter().next() {
                scalar.push_str(&first);
            }
        }

        Ok(if fan_out {
            ClauseResult::Items(items)
        } else {
            ClauseResult::Scalar(scalar)
        })
    }

    fn today(&self) -> Result<String> {
        let date = self.parameters.tenant_configuration.today()?;
        Ok(date.format(ISO_DATE_FORMAT).to_string())
    }

    /// Raw values of a field or byte-range token, one per occurrence.
    fn extract(&self, token: &Token) -> Result<Extracted> {
        match token {
            Token::Field { tag, codes } if is_control_tag(tag) => Ok(Extracted {
                values: self
                    .record
                    .control_fields_by_tag(tag)
                    .filter(|_| codes.is_empty())
                    .map(|field| field.data.clone())
                    .collect(),
                from_subfields: false,
            }),
            Token::Field { tag, codes } => Ok(Extracted {
                values: self
                    .record
                    .fields_by_tag(tag)
                    .filter_map(|field| {
                        if codes.is_empty() {
                            Some(field.value())
                        } else {
                            let parts = field.get_subfields(codes);
                            (!parts.is_empty()).then(|| parts.join(" "))
                        }
                    })
                    .collect(),
                from_subfields: true,
            }),
            Token::ByteRange { tag, start, end } => {
                let sources: Vec<&str> = if tag == LEADER_TAG {
                    vec![self.record.leader.as_str()]
                } else if is_control_tag(tag) {
                    self.record
                        .control_fields_by_tag(tag)
                        .map(|field| field.data.as_str())
                        .collect()
                } else {
                    return Err(MappingError::InvalidExpression(format!(
                        "byte range on data field {tag}"
                    )));
                };
                Ok(Extracted {
                    values: sources
                        .into_iter()
                        .filter_map(|data| slice_chars(data, *start, *end))
                        .collect(),
                    from_subfields: false,
                })
            }
            Token::Literal(_) | Token::Today | Token::Remove => Ok(Extracted {
                values: Vec::new(),
                from_subfields: false,
            }),
        }
    }
}

impl RecordReader for MarcRecordReader<'_> {
    fn read(&self, rule: &MappingRule) -> Result<Value> {
        self.read_with(rule, false)
    }

    fn read_grouping(&self, rule: &MappingRule) -> Result<Value> {
        self.read_with(rule, true)
    }
}

fn bool_value(action: Option<BoolAction>) -> Value {
    match action {
        Some(BoolAction::AllTrue) => Value::Bool(true),
        Some(BoolAction::AllFalse) => Value::Bool(false),
        Some(BoolAction::Remove) => Value::removal(),
        Some(BoolAction::AsIs) | None => Value::Missing,
    }
}

/// Merge a token's values into the clause result.
///
/// Equal lengths correlate pairwise by index; any other combination appends.
/// The append fallback for unequal lengths is kept as observed behavior.
fn correlate(items: &mut Vec<String>, values: Vec<String>) {
    if values.is_empty() {
        return;
    }
    if items.len() == values.len() {
        for (item, value) in items.iter_mut().zip(values) {
            item.push_str(&value);
        }
    } else {
        items.extend(values);
    }
}

/// Characters `[start, end)` of `data`, with `end` capped at its length.
fn slice_chars(data: &str, start: usize, end: usize) -> Option<String> {
    let len = data.chars().count();
    if start >= len {
        return None;
    }
    Some(data.chars().skip(start).take(end.min(len) - start).collect())
}
