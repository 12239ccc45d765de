//! Evaluation of repeatable-field rules.
//!
//! Each [`RepeatableGroup`] describes one destination object. When its fields
//! read a repeated data field, the group is evaluated once per occurrence of
//! that driving tag, so every object is built from one occurrence and a field
//! absent from an occurrence stays absent from its object. An object missing a
//! required field is dropped on its own. Within one evaluation a field that
//! still yields several values explodes the object, scalar siblings copied
//! into each. Finally every object of the group is back-filled with the
//! properties of the first one so the group comes out structurally uniform.

use super::expression::{Expression, Token};
use super::MarcRecordReader;
use crate::error::Result;
use crate::record::is_control_tag;
use crate::rule::{MappingRule, RepeatableGroup};
use crate::value::{MergePolicy, RepeatableItem, Value};
use tracing::trace;

/// Evaluated field of a group, keyed by its path relative to the group.
struct GroupField {
    key: String,
    value: Value,
    required: bool,
    array_key: bool,
}

impl GroupField {
    /// Number of objects this field asks for.
    fn width(&self) -> usize {
        match &self.value {
            Value::List { items, .. } if !self.array_key => items.len(),
            Value::Missing => 0,
            _ => 1,
        }
    }

    /// The value this field contributes to object `index`.
    fn slot(&self, index: usize) -> Option<Value> {
        match &self.value {
            Value::Missing => None,
            Value::List { items, .. } if !self.array_key => match items.as_slice() {
                [single] => Some(Value::string(single.clone())),
                _ => items.get(index).cloned().map(Value::string),
            },
            other if other.is_missing() => None,
            other => Some(other.clone()),
        }
    }
}

/// Evaluate a repeatable-field rule into a [`Value::Repeatable`].
///
/// A `DELETE_EXISTING` rule without groups yields an empty repeatable value so
/// the writer can drop the existing array. Any other rule that produces no
/// object yields [`Value::Missing`].
///
/// # Errors
///
/// Returns fatal errors raised while evaluating nested fields.
pub fn read_repeatable(reader: &MarcRecordReader<'_>, rule: &MappingRule) -> Result<Value> {
    let policy = rule.repeatable_action.unwrap_or_default();

    let mut groups: Vec<&RepeatableGroup> = rule.subfields.iter().collect();
    groups.sort_by_key(|group| group.order);

    let mut items = Vec::new();
    for group in groups {
        items.extend(read_group(reader, rule, group)?);
    }

    if items.is_empty() && policy != MergePolicy::DeleteExisting {
        return Ok(Value::Missing);
    }
    Ok(Value::repeatable(items, policy, rule.path.clone()))
}

fn read_group(
    reader: &MarcRecordReader<'_>,
    rule: &MappingRule,
    group: &RepeatableGroup,
) -> Result<Vec<RepeatableItem>> {
    let mut items = Vec::new();
    match driving_tag(reader, rule, group) {
        Some((tag, count)) => {
            for index in 0..count {
                let Some(occurrence) = reader.record.with_single_occurrence(&tag, index) else {
                    continue;
                };
                let scoped = reader.scoped(&occurrence);
                let exploded = explode_fields(&scoped, rule, group)?;
                if exploded.is_empty() {
                    trace!(path = %group.path, %tag, index, "occurrence produced no item");
                }
                items.extend(exploded);
            }
        }
        None => items = explode_fields(reader, rule, group)?,
    }

    sparse_fill(&mut items);
    Ok(items)
}

/// The most repeated data tag read by the group's non-array fields, if any
/// occurs more than once.
fn driving_tag(
    reader: &MarcRecordReader<'_>,
    rule: &MappingRule,
    group: &RepeatableGroup,
) -> Option<(String, usize)> {
    let mut best: Option<(String, usize)> = None;
    let fields = group
        .fields
        .iter()
        .filter(|field| field.enabled)
        .filter(|field| !relative_key(&group.path, &rule.path, &field.path).ends_with("[]"));

    for field in fields {
        let Some(expression) = field
            .expression
            .as_deref()
            .and_then(|text| Expression::parse(text).ok())
        else {
            continue;
        };
        let tokens = expression.clauses.iter().flat_map(|clause| &clause.tokens);
        for token in tokens {
            let Token::Field { tag, .. } = token else {
                continue;
            };
            if is_control_tag(tag) {
                continue;
            }
            let count = reader.record.occurrence_count(tag);
            if count > 1 && best.as_ref().map_or(true, |(_, most)| count > *most) {
                best = Some((tag.clone(), count));
            }
        }
    }
    best
}

fn explode_fields(
    reader: &MarcRecordReader<'_>,
    rule: &MappingRule,
    group: &RepeatableGroup,
) -> Result<Vec<RepeatableItem>> {
    let mut fields = Vec::with_capacity(group.fields.len());
    for field in group.fields.iter().filter(|field| field.enabled) {
        let key = relative_key(&group.path, &rule.path, &field.path);
        fields.push(GroupField {
            array_key: key.ends_with("[]"),
            key,
            value: reader.read_nested(field)?,
            required: field.required,
        });
    }

    let width = fields.iter().map(GroupField::width).max().unwrap_or(0);
    let mut items = Vec::with_capacity(width);

    for index in 0..width {
        let mut item = RepeatableItem::new();
        let mut complete = true;
        for field in &fields {
            match field.slot(index) {
                Some(value) => {
                    item.insert(field.key.clone(), value);
                }
                None if field.required => complete = false,
                None => {}
            }
        }

        if !complete {
            trace!(path = %group.path, index, "dropping item without required field");
        } else if !item.is_empty() {
            items.push(item);
        }
    }
    Ok(items)
}

/// Copy properties of the first item into later items that lack them.
pub fn sparse_fill(items: &mut [RepeatableItem]) {
    let Some((first, rest)) = items.split_first_mut() else {
        return;
    };
    for item in rest {
        for (key, value) in first.iter() {
            if !item.contains_key(key) {
                item.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Path of a field relative to its group (or, failing that, its rule).
///
/// `holdings.holdingsStatements[].statement` under
/// `holdings.holdingsStatements[]` becomes `statement`. A path sharing
/// neither prefix keeps only its last segment.
#[must_use]
pub fn relative_key(group_path: &str, rule_path: &str, field_path: &str) -> String {
    [group_path, rule_path]
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .find_map(|prefix| {
            field_path
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
                .filter(|rest| !rest.is_empty())
        })
        .unwrap_or_else(|| field_path.rsplit('.').next().unwrap_or(field_path))
        .to_string()
}
