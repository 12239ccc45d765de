//! Path-addressed writing of values into an output document.
//!
//! This module provides [`JsonEntityWriter`], which merges [`Value`]s into a
//! JSON document addressed by dotted paths such as `instance.title` or
//! `instance.natureOfContentTermIds[]`. A trailing `[]` marks an array and is
//! only allowed on the final segment.
//!
//! # Write semantics
//!
//! - strings and booleans overwrite the leaf, creating intermediate objects
//! - a deletion marker removes the leaf key only
//! - lists and repeatable objects are merged into the array according to a
//!   [`MergePolicy`]; removing an array also removes its parent key when the
//!   parent is left empty
//!
//! Kind mismatches between value and path are errors and leave the document
//! untouched.
//!
//! # Examples
//!
//! ```
//! use marc_mapping::writer::{EntityWriter, JsonEntityWriter};
//! use marc_mapping::{MergePolicy, Value};
//! use serde_json::json;
//!
//! let mut writer = JsonEntityWriter::new(json!({"instance": {"natureOfContentTermIds": ["UUID1"]}}));
//! writer.write_with_policy(
//!     "instance.natureOfContentTermIds[]",
//!     &Value::list(["UUID2"], MergePolicy::ExtendExisting),
//!     MergePolicy::ExtendExisting,
//! )?;
//! writer.write("instance.title", &Value::string("Title"))?;
//!
//! assert_eq!(
//!     writer.document(),
//!     &json!({"instance": {"natureOfContentTermIds": ["UUID1", "UUID2"], "title": "Title"}})
//! );
//! # Ok::<(), marc_mapping::MappingError>(())
//! ```

use crate::entity::EntityType;
use crate::error::{MappingError, Result};
use crate::value::{MergePolicy, RepeatableItem, Value};
use serde_json::{Map, Value as Json};

/// Marker suffix of an array segment.
pub const ARRAY_MARKER: &str = "[]";

/// Trait for writers that merge values into an output document.
pub trait EntityWriter {
    /// Write a value; lists and repeatable values are appended.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid path or a value/path kind mismatch.
    fn write(&mut self, path: &str, value: &Value) -> Result<()>;

    /// Write a value merging arrays according to `policy`.
    ///
    /// The policy is ignored for strings and booleans.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid path or a value/path kind mismatch.
    fn write_with_policy(&mut self, path: &str, value: &Value, policy: MergePolicy) -> Result<()>;

    /// The document built so far.
    fn document(&self) -> &Json;

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn finalize(&self) -> Result<String>;
}

/// A parsed destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    parents: Vec<String>,
    leaf: String,
    array: bool,
}

impl EntityPath {
    /// Parse a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::InvalidPath`] for an empty path, an empty
    /// segment, or an array marker before the final segment.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(MappingError::InvalidPath("empty path".to_string()));
        }

        let segments: Vec<&str> = trimmed.split('.').collect();
        let last = segments.len() - 1;
        let mut parents = Vec::with_capacity(last);
        let mut leaf = String::new();
        let mut array = false;

        for (i, segment) in segments.iter().enumerate() {
            let (name, marked) = match segment.strip_suffix(ARRAY_MARKER) {
                Some(name) => (name, true),
                None => (*segment, false),
            };
            if name.is_empty() || name.contains(|c: char| c == '[' || c == ']') {
                return Err(MappingError::InvalidPath(format!(
                    "{path}: malformed segment '{segment}'"
                )));
            }
            if marked && i != last {
                return Err(MappingError::InvalidPath(format!(
                    "{path}: array marker on non-terminal segment '{segment}'"
                )));
            }
            if i == last {
                leaf = name.to_string();
                array = marked;
            } else {
                parents.push(name.to_string());
            }
        }

        Ok(EntityPath {
            parents,
            leaf,
            array,
        })
    }

    /// Segments leading to the leaf.
    #[must_use]
    pub fn parents(&self) -> &[String] {
        &self.parents
    }

    /// Final segment without array marker.
    #[must_use]
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    /// Whether the final segment is array-marked.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        self.array
    }
}

/// Writer over a `serde_json` document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonEntityWriter {
    entity: Option<EntityType>,
    document: Json,
}

impl JsonEntityWriter {
    /// Start from an existing document; `null` starts from an empty object.
    #[must_use]
    pub fn new(document: Json) -> Self {
        let document = if document.is_null() {
            Json::Object(Map::new())
        } else {
            document
        };
        JsonEntityWriter {
            entity: None,
            document,
        }
    }

    /// Start from an existing document for an entity type.
    #[must_use]
    pub fn for_entity(entity: EntityType, document: Json) -> Self {
        JsonEntityWriter {
            entity: Some(entity),
            ..Self::new(document)
        }
    }

    /// Entity type this writer is bound to.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityType> {
        self.entity
    }

    /// Consume the writer and return the document.
    #[must_use]
    pub fn into_document(self) -> Json {
        self.document
    }

    fn apply(&mut self, path: &str, value: &Value, policy: Option<MergePolicy>) -> Result<()> {
        let target = EntityPath::parse(path)?;
        match value {
            Value::Missing => Ok(()),
            Value::Str { removal: true, .. } => {
                if let Some(parent) = find_object_mut(&mut self.document, &target.parents) {
                    parent.shift_remove(&target.leaf);
                }
                Ok(())
            }
            Value::Str { text, .. } => self.set_scalar(&target, path, Json::String(text.clone())),
            Value::Bool(flag) => self.set_scalar(&target, path, Json::Bool(*flag)),
            Value::List { items, .. } => {
                let incoming = items.iter().cloned().map(Json::String).collect();
                self.merge_array(&target, path, value, incoming, policy)
            }
            Value::Repeatable { items, .. } => {
                let mut incoming = Vec::with_capacity(items.len());
                for item in items {
                    let object = build_object(item)?;
                    if object.as_object().is_some_and(|map| !map.is_empty()) {
                        incoming.push(object);
                    }
                }
                self.merge_array(&target, path, value, incoming, policy)
            }
        }
    }

    fn set_scalar(&mut self, target: &EntityPath, path: &str, json: Json) -> Result<()> {
        if target.array {
            return Err(MappingError::TypeMismatch(format!(
                "cannot write a scalar to array path {path}"
            )));
        }
        let parent = object_mut(&mut self.document, &target.parents, path)?;
        parent.insert(target.leaf.clone(), json);
        Ok(())
    }

    fn merge_array(
        &mut self,
        target: &EntityPath,
        path: &str,
        value: &Value,
        incoming: Vec<Json>,
        policy: Option<MergePolicy>,
    ) -> Result<()> {
        if !target.array {
            return Err(MappingError::TypeMismatch(format!(
                "cannot write a {} value to non-array path {path}",
                value.kind()
            )));
        }
        if let Some(existing) =
            find_object(&self.document, &target.parents).and_then(|p| p.get(&target.leaf))
        {
            if !existing.is_array() && !existing.is_null() {
                return Err(MappingError::TypeMismatch(format!(
                    "{path} holds a non-array value"
                )));
            }
        }

        match policy.unwrap_or_default() {
            MergePolicy::ExtendExisting => {
                if incoming.is_empty() {
                    return Ok(());
                }
                let parent = object_mut(&mut self.document, &target.parents, path)?;
                match parent.get_mut(&target.leaf) {
                    Some(Json::Array(existing)) => existing.extend(incoming),
                    _ => {
                        parent.insert(target.leaf.clone(), Json::Array(incoming));
                    }
                }
            }
            MergePolicy::ExchangeExisting if incoming.is_empty() => self.remove_array(target),
            MergePolicy::ExchangeExisting => {
                let parent = object_mut(&mut self.document, &target.parents, path)?;
                parent.insert(target.leaf.clone(), Json::Array(incoming));
            }
            MergePolicy::DeleteExisting => self.remove_array(target),
            MergePolicy::DeleteIncoming => {
                let incoming: Vec<Json> = incoming.iter().map(canonical).collect();
                let emptied = match find_object_mut(&mut self.document, &target.parents)
                    .and_then(|p| p.get_mut(&target.leaf))
                {
                    Some(Json::Array(existing)) => {
                        existing.retain(|element| !incoming.contains(&canonical(element)));
                        existing.is_empty()
                    }
                    _ => false,
                };
                if emptied {
                    self.remove_array(target);
                }
            }
        }
        Ok(())
    }

    /// Remove the array and compact its parent if that leaves it empty.
    fn remove_array(&mut self, target: &EntityPath) {
        let removed = find_object_mut(&mut self.document, &target.parents)
            .and_then(|parent| parent.shift_remove(&target.leaf))
            .is_some();
        if !removed {
            return;
        }
        if let Some((parent_key, grand)) = target.parents.split_last() {
            if let Some(grandparent) = find_object_mut(&mut self.document, grand) {
                if grandparent
                    .get(parent_key)
                    .and_then(Json::as_object)
                    .is_some_and(Map::is_empty)
                {
                    grandparent.shift_remove(parent_key);
                }
            }
        }
    }
}

impl EntityWriter for JsonEntityWriter {
    fn write(&mut self, path: &str, value: &Value) -> Result<()> {
        self.apply(path, value, None)
    }

    fn write_with_policy(&mut self, path: &str, value: &Value, policy: MergePolicy) -> Result<()> {
        self.apply(path, value, Some(policy))
    }

    fn document(&self) -> &Json {
        &self.document
    }

    fn finalize(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.document)?)
    }
}

/// Build one destination object from a repeatable item.
fn build_object(item: &RepeatableItem) -> Result<Json> {
    let mut writer = JsonEntityWriter::new(Json::Object(Map::new()));
    for (key, value) in item {
        writer.write(key, value)?;
    }
    Ok(writer.into_document())
}

/// Walk to the parent object of a path, creating missing objects.
fn object_mut<'d>(
    document: &'d mut Json,
    parents: &[String],
    path: &str,
) -> Result<&'d mut Map<String, Json>> {
    if document.is_null() {
        *document = Json::Object(Map::new());
    }
    let Some(mut current) = document.as_object_mut() else {
        return Err(MappingError::TypeMismatch(format!(
            "{path}: document root is not an object"
        )));
    };
    for segment in parents {
        let next = current
            .entry(segment.clone())
            .or_insert_with(|| Json::Object(Map::new()));
        if next.is_null() {
            *next = Json::Object(Map::new());
        }
        current = match next {
            Json::Object(map) => map,
            _ => {
                return Err(MappingError::TypeMismatch(format!(
                    "{path}: '{segment}' is not an object"
                )))
            }
        };
    }
    Ok(current)
}

fn find_object<'d>(document: &'d Json, parents: &[String]) -> Option<&'d Map<String, Json>> {
    let mut current = document.as_object()?;
    for segment in parents {
        current = current.get(segment)?.as_object()?;
    }
    Some(current)
}

/// Walk to the parent object of a path without creating anything.
fn find_object_mut<'d>(document: &'d mut Json, parents: &[String]) -> Option<&'d mut Map<String, Json>> {
    let mut current = document.as_object_mut()?;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some(current)
}

/// Copy of a JSON value with object keys sorted, for order-insensitive comparison.
fn canonical(json: &Json) -> Json {
    match json {
        Json::Object(map) => {
            let mut entries: Vec<(&String, &Json)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Json::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonical(value)))
                    .collect(),
            )
        }
        Json::Array(items) => Json::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
