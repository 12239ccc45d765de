//! MARC-in-JSON conversion for source records.
//!
//! The host hands records over in the MARC-in-JSON shape:
//!
//! - `leader` is a top-level string
//! - Control fields (001-009): `{tag: value}`
//! - Data fields (010+): `{tag: {ind1, ind2, subfields: [{code: value}, ...]}}`
//!
//! ```json
//! {
//!   "leader": "00000nam  2200000 a 4500",
//!   "fields": [
//!     { "001": "in00001" },
//!     { "945": { "ind1": " ", "ind2": " ", "subfields": [ { "a": "31234" }, { "h": "MAIN" } ] } }
//!   ]
//! }
//! ```

use crate::error::{MappingError, Result};
use crate::record::{DataField, SourceRecord};
use serde_json::{json, Map, Value};

/// Convert a MARC-in-JSON document to a [`SourceRecord`].
///
/// Field kind follows the JSON shape: a string value is a control field, an
/// object value is a data field. Missing indicators default to blank.
///
/// # Examples
///
/// ```
/// use marc_mapping::marcjson;
/// use serde_json::json;
///
/// let record = marcjson::marcjson_to_record(&json!({
///     "leader": "00000nam  2200000 a 4500",
///     "fields": [ { "001": "in00001" } ]
/// }))?;
/// assert_eq!(record.get_control_field("001"), Some("in00001"));
/// # Ok::<(), marc_mapping::MappingError>(())
/// ```
///
/// # Errors
///
/// Returns an error if the document is not an object, has no `fields` array,
/// or contains a field that is neither a string nor an object.
pub fn marcjson_to_record(json: &Value) -> Result<SourceRecord> {
    let obj = json
        .as_object()
        .ok_or_else(|| MappingError::InvalidRecord("Expected JSON object".to_string()))?;

    let leader = obj.get("leader").and_then(Value::as_str).unwrap_or_default();
    let mut record = SourceRecord::new(leader);

    let fields = obj
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| MappingError::InvalidRecord("Missing fields array".to_string()))?;

    for item in fields {
        let field_obj = item
            .as_object()
            .ok_or_else(|| MappingError::InvalidRecord("Field must be object".to_string()))?;

        for (tag, value) in field_obj {
            match value {
                Value::String(data) => record.add_control_field(tag.clone(), data.clone()),
                Value::Object(content) => record.add_field(parse_data_field(tag, content)),
                _ => {
                    return Err(MappingError::InvalidRecord(format!(
                        "Field {tag} must be a string or an object"
                    )))
                }
            }
        }
    }

    Ok(record)
}

fn parse_data_field(tag: &str, content: &Map<String, Value>) -> DataField {
    let indicator = |key: &str| {
        content
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.chars().next())
            .unwrap_or(' ')
    };

    let mut field = DataField::new(tag, indicator("ind1"), indicator("ind2"));

    if let Some(subfields) = content.get("subfields").and_then(Value::as_array) {
        for sf_obj in subfields.iter().filter_map(Value::as_object) {
            for (code, value) in sf_obj {
                if let (Some(code_char), Some(str_value)) = (code.chars().next(), value.as_str()) {
                    field.add_subfield(code_char, str_value);
                }
            }
        }
    }

    field
}

/// Parse a MARC-in-JSON string.
///
/// # Errors
///
/// Returns an error if the text is not JSON or not a valid MARC-in-JSON record.
pub fn marcjson_str_to_record(text: &str) -> Result<SourceRecord> {
    let json: Value = serde_json::from_str(text)?;
    marcjson_to_record(&json)
}

/// Convert a [`SourceRecord`] back to MARC-in-JSON.
///
/// Control fields are emitted before data fields, each group in source order.
#[must_use]
pub fn record_to_marcjson(record: &SourceRecord) -> Value {
    let mut fields = Vec::with_capacity(record.control_fields.len() + record.data_fields.len());

    for field in &record.control_fields {
        let mut obj = Map::new();
        obj.insert(field.tag.clone(), Value::String(field.data.clone()));
        fields.push(Value::Object(obj));
    }

    for field in &record.data_fields {
        let subfields: Vec<Value> = field
            .subfields
            .iter()
            .map(|sf| {
                let mut obj = Map::new();
                obj.insert(sf.code.to_string(), Value::String(sf.value.clone()));
                Value::Object(obj)
            })
            .collect();

        let mut obj = Map::new();
        obj.insert(
            field.tag.clone(),
            json!({
                "ind1": field.indicator1.to_string(),
                "ind2": field.indicator2.to_string(),
                "subfields": subfields,
            }),
        );
        fields.push(Value::Object(obj));
    }

    json!({
        "leader": record.leader,
        "fields": fields,
    })
}
